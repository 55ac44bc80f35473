//! End-to-end progression flows: session-open decay checks, completion
//! toggles, achievement evaluation and bulk reset, against both store
//! implementations.

use momentum_core::{
    AchievementEngine, CalendarDay, CheckContext, CompletionTracker, DecayEngine, MemoryStore,
    ResetOptions, ScoreLedger, Settings, SqliteStore, Store, StoreExt, StreakCalculator,
    ToggleOutcome,
};
use momentum_core::{Activity, Collection};

fn day(s: &str) -> CalendarDay {
    s.parse().unwrap()
}

fn seed_activity(store: &dyn Store, id: &str, points: i64) {
    store
        .put_record(
            Collection::Activities,
            &Activity {
                id: id.to_string(),
                name: id.to_string(),
                points,
                category_id: None,
                archived: false,
                order: 0,
            },
        )
        .unwrap();
}

/// A full first week: first run, daily completions, streak and
/// first-completion achievements, then a decayed comeback.
fn run_first_week(store: &dyn Store) {
    let decay = DecayEngine::new(store);
    let ledger = ScoreLedger::new(store);
    let tracker = CompletionTracker::new(store);
    let achievements = AchievementEngine::new(store);

    seed_activity(store, "stretch", 50);
    decay.set_decay_amount(50).unwrap();

    // Day 1: first run, no decay.
    let d1 = day("2025-03-01");
    let outcome = decay.check_and_apply(d1).unwrap();
    assert!(outcome.is_first_day);
    assert!(!outcome.applied);

    let toggled = tracker.toggle(d1, "stretch").unwrap();
    assert!(matches!(toggled, ToggleOutcome::Completed { .. }));
    let unlocked = achievements.check_for_new(d1, CheckContext::default()).unwrap();
    assert_eq!(unlocked, vec!["first_steps".to_string()]);

    // Days 2 and 3: open the app, decay covered by the completion.
    for date in ["2025-03-02", "2025-03-03"] {
        let d = day(date);
        let outcome = decay.check_and_apply(d).unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.decay, 50);
        tracker.toggle(d, "stretch").unwrap();
        let status = ledger.break_even_status(d).unwrap();
        assert!(status.break_even);
    }

    // Three successful days on the ledger.
    let streaks = StreakCalculator::new(store);
    assert_eq!(streaks.successful_day_streak(day("2025-03-03")).unwrap(), 3);
    let unlocked = achievements
        .check_for_new(day("2025-03-03"), CheckContext::default())
        .unwrap();
    assert_eq!(unlocked, vec!["streak_3".to_string()]);

    // Two days away: 2 * 50 decay drives the score negative.
    let d5 = day("2025-03-05");
    let before = ledger.score().unwrap();
    let outcome = decay.check_and_apply(d5).unwrap();
    assert!(outcome.applied);
    assert_eq!(outcome.days_away, 2);
    assert_eq!(outcome.decay, 100);
    let after = ledger.score().unwrap();
    assert_eq!(after, before - 100);
    assert!(after < 0);

    // Re-opening the same day is a no-op.
    let repeat = decay.check_and_apply(d5).unwrap();
    assert!(!repeat.applied);
    assert_eq!(ledger.score().unwrap(), after);

    // Completing pushes the score back over zero; recovery fires once.
    tracker.toggle(d5, "stretch").unwrap();
    tracker.toggle(d5, "stretch").unwrap(); // off again
    tracker.toggle(d5, "stretch").unwrap(); // back on
    let current = ledger.score().unwrap();
    assert_eq!(current, after + 50);
    assert!(current >= 0);

    let unlocked = achievements
        .check_for_new(
            d5,
            CheckContext {
                previous_score: Some(after),
            },
        )
        .unwrap();
    assert!(unlocked.contains(&"comeback".to_string()));
    let again = achievements
        .check_for_new(
            d5,
            CheckContext {
                previous_score: Some(after),
            },
        )
        .unwrap();
    assert!(again.is_empty());
}

#[test]
fn first_week_on_memory_store() {
    let store = MemoryStore::new();
    run_first_week(&store);
}

#[test]
fn first_week_on_sqlite_store() {
    let store = SqliteStore::open_in_memory().unwrap();
    run_first_week(&store);
}

#[test]
fn state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("momentum.db");
    let d1 = day("2025-03-01");

    {
        let store = SqliteStore::open_at(&path).unwrap();
        seed_activity(&store, "stretch", 10);
        DecayEngine::new(&store).set_decay_amount(5).unwrap();
        DecayEngine::new(&store).check_and_apply(d1).unwrap();
        CompletionTracker::new(&store).toggle(d1, "stretch").unwrap();
    }

    let store = SqliteStore::open_at(&path).unwrap();
    let ledger = ScoreLedger::new(&store);
    assert_eq!(ledger.score().unwrap(), 10);

    let settings = Settings::load(&store).unwrap();
    assert_eq!(settings.decay_amount, 5);
    assert_eq!(settings.first_use_date, Some(d1));
    assert_eq!(settings.last_active_date, Some(d1));

    // Same-day idempotence holds across handles.
    let outcome = DecayEngine::new(&store).check_and_apply(d1).unwrap();
    assert!(!outcome.applied);

    let record = ledger.record_on(d1).unwrap().unwrap();
    assert_eq!(record.earned, 10);
}

#[test]
fn reset_clears_progress_but_keeps_activities() {
    let store = MemoryStore::new();
    seed_activity(&store, "stretch", 10);
    let d1 = day("2025-03-01");

    DecayEngine::new(&store).check_and_apply(d1).unwrap();
    CompletionTracker::new(&store).toggle(d1, "stretch").unwrap();
    AchievementEngine::new(&store)
        .check_for_new(d1, CheckContext::default())
        .unwrap();

    let ledger = ScoreLedger::new(&store);
    let summary = ledger
        .reset(ResetOptions {
            history: true,
            score: true,
            completions: true,
            achievements: true,
        })
        .unwrap();
    assert_eq!(summary.deleted_history_records, 1);
    assert_eq!(summary.deleted_completions, 1);
    assert!(summary.deleted_achievements >= 1);

    assert_eq!(ledger.score().unwrap(), 0);
    assert!(ledger.history().unwrap().is_empty());
    assert_eq!(store.get_all(Collection::Activities).unwrap().len(), 1);

    // After a reset the first-completion achievement can be earned
    // again on the next completion.
    CompletionTracker::new(&store).toggle(d1, "stretch").unwrap();
    let unlocked = AchievementEngine::new(&store)
        .check_for_new(d1, CheckContext::default())
        .unwrap();
    assert!(unlocked.contains(&"first_steps".to_string()));
}
