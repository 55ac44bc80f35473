//! Achievement definitions and the idempotent unlock evaluator.
//!
//! Definitions are a static table; unlocks are persisted records keyed
//! by definition id. Unlocking is "unlock if not present", so a full
//! evaluation pass can run after every score-affecting mutation and an
//! already-unlocked id is never returned again.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarDay;
use crate::error::Result;
use crate::ledger::ScoreLedger;
use crate::model::AchievementUnlock;
use crate::store::{Collection, Store, StoreExt};
use crate::streaks::StreakCalculator;

/// The rule families achievements are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    ScoreMilestone,
    Streak,
    PerfectWeek,
    Recovery,
    FirstCompletion,
    ActivityCount,
}

/// A static achievement rule. Not persisted; identified by `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub kind: AchievementKind,
    pub threshold: i64,
}

/// Fixed perfect-day streak length for the perfect-week achievement.
pub const PERFECT_WEEK_TARGET: i64 = 7;

/// The static rule table. Table order within a kind is ascending by
/// threshold; evaluation order across kinds follows [`KIND_ORDER`].
pub const DEFINITIONS: &[AchievementDefinition] = &[
    AchievementDefinition { id: "score_100", kind: AchievementKind::ScoreMilestone, threshold: 100 },
    AchievementDefinition { id: "score_500", kind: AchievementKind::ScoreMilestone, threshold: 500 },
    AchievementDefinition { id: "score_1000", kind: AchievementKind::ScoreMilestone, threshold: 1000 },
    AchievementDefinition { id: "score_5000", kind: AchievementKind::ScoreMilestone, threshold: 5000 },
    AchievementDefinition { id: "streak_3", kind: AchievementKind::Streak, threshold: 3 },
    AchievementDefinition { id: "streak_7", kind: AchievementKind::Streak, threshold: 7 },
    AchievementDefinition { id: "streak_30", kind: AchievementKind::Streak, threshold: 30 },
    AchievementDefinition { id: "streak_100", kind: AchievementKind::Streak, threshold: 100 },
    AchievementDefinition { id: "perfect_week", kind: AchievementKind::PerfectWeek, threshold: PERFECT_WEEK_TARGET },
    AchievementDefinition { id: "comeback", kind: AchievementKind::Recovery, threshold: 0 },
    AchievementDefinition { id: "first_steps", kind: AchievementKind::FirstCompletion, threshold: 1 },
    AchievementDefinition { id: "completions_10", kind: AchievementKind::ActivityCount, threshold: 10 },
    AchievementDefinition { id: "completions_100", kind: AchievementKind::ActivityCount, threshold: 100 },
    AchievementDefinition { id: "completions_500", kind: AchievementKind::ActivityCount, threshold: 500 },
];

/// Stable display order for newly-unlocked ids.
const KIND_ORDER: [AchievementKind; 6] = [
    AchievementKind::ScoreMilestone,
    AchievementKind::Streak,
    AchievementKind::PerfectWeek,
    AchievementKind::Recovery,
    AchievementKind::FirstCompletion,
    AchievementKind::ActivityCount,
];

/// The recovery predicate: the score crossed from negative back to
/// non-negative.
pub fn check_recovery_condition(previous_score: i64, current_score: i64) -> bool {
    previous_score < 0 && current_score >= 0
}

/// Caller-supplied context for one evaluation pass.
///
/// `previous_score` is the score observed before the triggering
/// mutation; the engine cannot infer it itself, and the recovery check
/// is skipped when it is absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckContext {
    pub previous_score: Option<i64>,
}

/// Progress toward the next threshold of one rule family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindProgress {
    pub current: i64,
    pub next: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerfectWeekProgress {
    pub current: i64,
    pub target: i64,
    pub unlocked: bool,
}

/// "Next goal" preview values for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    pub score: KindProgress,
    pub streak: KindProgress,
    pub activity_count: KindProgress,
    pub perfect_week: PerfectWeekProgress,
}

/// Evaluation signals gathered once per pass.
struct Signals {
    score: i64,
    day_streak: i64,
    perfect_streak: i64,
    completion_count: i64,
}

/// Unlock evaluator over the keyed-collection store.
pub struct AchievementEngine<'a> {
    store: &'a dyn Store,
}

impl<'a> AchievementEngine<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    fn signals(&self, today: CalendarDay) -> Result<Signals> {
        let streaks = StreakCalculator::new(self.store);
        Ok(Signals {
            score: ScoreLedger::new(self.store).score()?,
            day_streak: streaks.successful_day_streak(today)? as i64,
            perfect_streak: streaks.perfect_day_streak(today)? as i64,
            completion_count: self.store.get_all(Collection::Completions)?.len() as i64,
        })
    }

    fn unlocked_ids(&self) -> Result<HashSet<String>> {
        Ok(self
            .store
            .get_all_as::<AchievementUnlock>(Collection::Achievements)?
            .into_iter()
            .map(|u| u.id)
            .collect())
    }

    fn satisfied(definition: &AchievementDefinition, signals: &Signals, ctx: &CheckContext) -> bool {
        match definition.kind {
            AchievementKind::ScoreMilestone => signals.score >= definition.threshold,
            AchievementKind::Streak => signals.day_streak >= definition.threshold,
            AchievementKind::PerfectWeek => signals.perfect_streak >= PERFECT_WEEK_TARGET,
            AchievementKind::Recovery => ctx
                .previous_score
                .is_some_and(|previous| check_recovery_condition(previous, signals.score)),
            AchievementKind::FirstCompletion => signals.completion_count >= 1,
            AchievementKind::ActivityCount => signals.completion_count >= definition.threshold,
        }
    }

    /// Evaluate every definition and persist unlocks for the newly
    /// satisfied ones.
    ///
    /// Returns only the ids unlocked during this call, in stable display
    /// order: score milestones, streaks, perfect-week, recovery,
    /// first-completion, activity-count.
    pub fn check_for_new(&self, today: CalendarDay, ctx: CheckContext) -> Result<Vec<String>> {
        let signals = self.signals(today)?;
        let unlocked = self.unlocked_ids()?;

        let mut newly_unlocked = Vec::new();
        for kind in KIND_ORDER {
            for definition in DEFINITIONS.iter().filter(|d| d.kind == kind) {
                if unlocked.contains(definition.id) {
                    continue;
                }
                if !Self::satisfied(definition, &signals, &ctx) {
                    continue;
                }
                self.store.put_record(
                    Collection::Achievements,
                    &AchievementUnlock {
                        id: definition.id.to_string(),
                        unlocked_at: Utc::now(),
                    },
                )?;
                newly_unlocked.push(definition.id.to_string());
            }
        }
        Ok(newly_unlocked)
    }

    /// Current value and lowest still-locked threshold per rule family.
    ///
    /// `next` is `None` once every definition of the family is unlocked.
    pub fn progress(&self, today: CalendarDay) -> Result<AchievementProgress> {
        let signals = self.signals(today)?;
        let unlocked = self.unlocked_ids()?;

        let next_for = |kind: AchievementKind| -> Option<i64> {
            DEFINITIONS
                .iter()
                .filter(|d| d.kind == kind && !unlocked.contains(d.id))
                .map(|d| d.threshold)
                .min()
        };

        let perfect_week_unlocked = DEFINITIONS
            .iter()
            .filter(|d| d.kind == AchievementKind::PerfectWeek)
            .all(|d| unlocked.contains(d.id));

        Ok(AchievementProgress {
            score: KindProgress {
                current: signals.score,
                next: next_for(AchievementKind::ScoreMilestone),
            },
            streak: KindProgress {
                current: signals.day_streak,
                next: next_for(AchievementKind::Streak),
            },
            activity_count: KindProgress {
                current: signals.completion_count,
                next: next_for(AchievementKind::ActivityCount),
            },
            perfect_week: PerfectWeekProgress {
                current: signals.perfect_streak,
                target: PERFECT_WEEK_TARGET,
                unlocked: perfect_week_unlocked,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::HistoryUpdate;
    use crate::model::{Activity, Completion};
    use crate::store::MemoryStore;

    fn day(s: &str) -> CalendarDay {
        s.parse().unwrap()
    }

    fn put_completion(store: &MemoryStore, id: &str, activity_id: &str, date: &str) {
        store
            .put_record(
                Collection::Completions,
                &Completion {
                    id: id.to_string(),
                    activity_id: activity_id.to_string(),
                    date: day(date),
                    completed_at: Utc::now(),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_definition_ids_are_unique() {
        let ids: HashSet<&str> = DEFINITIONS.iter().map(|d| d.id).collect();
        assert_eq!(ids.len(), DEFINITIONS.len());
    }

    #[test]
    fn test_score_milestones_unlock_in_table_order() {
        let store = MemoryStore::new();
        let engine = AchievementEngine::new(&store);
        ScoreLedger::new(&store).set_score(600).unwrap();

        let unlocked = engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        assert_eq!(unlocked, vec!["score_100".to_string(), "score_500".to_string()]);
    }

    #[test]
    fn test_unlocks_are_monotonic() {
        let store = MemoryStore::new();
        let engine = AchievementEngine::new(&store);
        ScoreLedger::new(&store).set_score(150).unwrap();

        let first = engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        assert_eq!(first, vec!["score_100".to_string()]);

        let second = engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        assert!(second.is_empty());

        // Still nothing after the score climbs without crossing a new
        // threshold.
        ScoreLedger::new(&store).set_score(200).unwrap();
        let third = engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        assert!(third.is_empty());
    }

    #[test]
    fn test_recovery_unlocks_exactly_once() {
        // Scenario D: score -50 -> 10 with previous_score supplied.
        let store = MemoryStore::new();
        let engine = AchievementEngine::new(&store);
        let ledger = ScoreLedger::new(&store);

        ledger.set_score(-50).unwrap();
        let none = engine
            .check_for_new(
                day("2025-03-10"),
                CheckContext {
                    previous_score: Some(-60),
                },
            )
            .unwrap();
        assert!(none.is_empty()); // still negative, no recovery

        ledger.set_score(10).unwrap();
        let unlocked = engine
            .check_for_new(
                day("2025-03-10"),
                CheckContext {
                    previous_score: Some(-50),
                },
            )
            .unwrap();
        assert_eq!(unlocked, vec!["comeback".to_string()]);

        let again = engine
            .check_for_new(
                day("2025-03-10"),
                CheckContext {
                    previous_score: Some(-50),
                },
            )
            .unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_recovery_skipped_without_previous_score() {
        let store = MemoryStore::new();
        let engine = AchievementEngine::new(&store);
        ScoreLedger::new(&store).set_score(10).unwrap();

        let unlocked = engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        assert!(!unlocked.contains(&"comeback".to_string()));
    }

    #[test]
    fn test_recovery_condition_predicate() {
        assert!(check_recovery_condition(-1, 0));
        assert!(check_recovery_condition(-50, 10));
        assert!(!check_recovery_condition(0, 10));
        assert!(!check_recovery_condition(-50, -1));
        assert!(!check_recovery_condition(10, 20));
    }

    #[test]
    fn test_first_completion_and_activity_count() {
        let store = MemoryStore::new();
        let engine = AchievementEngine::new(&store);

        put_completion(&store, "c1", "a1", "2025-03-10");
        let unlocked = engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        assert!(unlocked.contains(&"first_steps".to_string()));
        assert!(!unlocked.contains(&"completions_10".to_string()));

        for i in 2..=10 {
            put_completion(&store, &format!("c{i}"), "a1", &format!("2025-02-{i:02}"));
        }
        let unlocked = engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        assert_eq!(unlocked, vec!["completions_10".to_string()]);
    }

    #[test]
    fn test_streak_and_perfect_week_unlocks() {
        let store = MemoryStore::new();
        let engine = AchievementEngine::new(&store);
        let ledger = ScoreLedger::new(&store);

        store
            .put_record(
                Collection::Activities,
                &Activity {
                    id: "a1".to_string(),
                    name: "Run".to_string(),
                    points: 5,
                    category_id: None,
                    archived: false,
                    order: 0,
                },
            )
            .unwrap();

        // Seven consecutive successful days with completions.
        for i in 4..=10 {
            let date = format!("2025-03-{i:02}");
            ledger
                .record_history(
                    day(&date),
                    HistoryUpdate {
                        date: Some(day(&date)),
                        score: Some(0),
                        earned: Some(5),
                        decay: Some(0),
                    },
                )
                .unwrap();
            put_completion(&store, &format!("c{i}"), "a1", &date);
        }

        let unlocked = engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        // Display order: streaks before perfect-week before
        // first-completion.
        assert_eq!(
            unlocked,
            vec![
                "streak_3".to_string(),
                "streak_7".to_string(),
                "perfect_week".to_string(),
                "first_steps".to_string(),
            ]
        );
    }

    #[test]
    fn test_progress_reports_next_thresholds() {
        let store = MemoryStore::new();
        let engine = AchievementEngine::new(&store);
        ScoreLedger::new(&store).set_score(150).unwrap();

        engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        let progress = engine.progress(day("2025-03-10")).unwrap();

        assert_eq!(progress.score.current, 150);
        assert_eq!(progress.score.next, Some(500)); // 100 already unlocked
        assert_eq!(progress.streak.current, 0);
        assert_eq!(progress.streak.next, Some(3));
        assert_eq!(progress.activity_count.next, Some(10));
        assert_eq!(progress.perfect_week.target, PERFECT_WEEK_TARGET);
        assert!(!progress.perfect_week.unlocked);
    }

    #[test]
    fn test_progress_next_absent_when_all_unlocked() {
        let store = MemoryStore::new();
        let engine = AchievementEngine::new(&store);
        ScoreLedger::new(&store).set_score(10_000).unwrap();

        engine
            .check_for_new(day("2025-03-10"), CheckContext::default())
            .unwrap();
        let progress = engine.progress(day("2025-03-10")).unwrap();
        assert_eq!(progress.score.next, None);
    }
}
