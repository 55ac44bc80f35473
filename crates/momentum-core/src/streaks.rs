//! Backward-scanning streak calculators.
//!
//! Three independent algorithms with deliberately different gap
//! semantics:
//!
//! - successful-day: walks the history ledger with exact date matching
//!   and `earned >= decay` per day;
//! - perfect-day: walks the calendar against the *current* activity set
//!   within a bounded lookback window;
//! - completion: walks the calendar against the set of dates with any
//!   completion at all.
//!
//! They are kept separate on purpose; do not unify them.

use std::collections::{HashMap, HashSet};

use crate::calendar::CalendarDay;
use crate::error::Result;
use crate::model::{Activity, Completion, DailyRecord};
use crate::store::{Collection, Store, StoreExt};

/// How far back the perfect-day scan looks, in days.
pub const PERFECT_STREAK_LOOKBACK_DAYS: u32 = 365;

/// Streak calculators over the keyed-collection store.
pub struct StreakCalculator<'a> {
    store: &'a dyn Store,
}

impl<'a> StreakCalculator<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Consecutive ledger days ending at or before `today` with
    /// `earned >= decay`.
    ///
    /// The scan starts at the most recent record dated `<= today`
    /// (future-dated anomalies are skipped) and tolerates no calendar
    /// gap: each step must find a record for exactly the previous day.
    /// A record with `earned == decay == 0` counts as successful.
    pub fn successful_day_streak(&self, today: CalendarDay) -> Result<u32> {
        let mut records: Vec<DailyRecord> = self.store.get_all_as(Collection::ScoreHistory)?;
        records.sort_by(|a, b| b.date.cmp(&a.date));

        let Some(start) = records.iter().position(|r| r.date <= today) else {
            return Ok(0);
        };

        let mut expected = records[start].date;
        let mut streak = 0u32;
        for record in &records[start..] {
            if record.date != expected || record.earned < record.decay {
                break;
            }
            streak += 1;
            match expected.pred() {
                Some(previous) => expected = previous,
                None => break,
            }
        }
        Ok(streak)
    }

    /// Consecutive days ending at `today` on which every currently
    /// non-archived activity has a completion.
    ///
    /// The activity set is a live snapshot: archiving or adding
    /// activities changes the retroactive value. Returns 0 immediately
    /// when no activities are active. Bounded at
    /// [`PERFECT_STREAK_LOOKBACK_DAYS`].
    pub fn perfect_day_streak(&self, today: CalendarDay) -> Result<u32> {
        let activities: Vec<Activity> = self.store.get_all_as(Collection::Activities)?;
        let active_ids: Vec<&str> = activities
            .iter()
            .filter(|a| !a.archived)
            .map(|a| a.id.as_str())
            .collect();
        if active_ids.is_empty() {
            return Ok(0);
        }

        let completions: Vec<Completion> = self.store.get_all_as(Collection::Completions)?;
        let mut completed_by_day: HashMap<CalendarDay, HashSet<&str>> = HashMap::new();
        for completion in &completions {
            completed_by_day
                .entry(completion.date)
                .or_default()
                .insert(completion.activity_id.as_str());
        }

        let mut day = today;
        let mut streak = 0u32;
        for _ in 0..PERFECT_STREAK_LOOKBACK_DAYS {
            let completed = completed_by_day.get(&day);
            let perfect = active_ids
                .iter()
                .all(|id| completed.is_some_and(|set| set.contains(id)));
            if !perfect {
                break;
            }
            streak += 1;
            match day.pred() {
                Some(previous) => day = previous,
                None => break,
            }
        }
        Ok(streak)
    }

    /// Consecutive days ending at `end_date` with at least one
    /// completion of any activity.
    pub fn completion_streak(&self, end_date: CalendarDay) -> Result<u32> {
        let completions: Vec<Completion> = self.store.get_all_as(Collection::Completions)?;
        let dates: HashSet<CalendarDay> = completions.iter().map(|c| c.date).collect();

        let mut day = end_date;
        let mut streak = 0u32;
        while dates.contains(&day) {
            streak += 1;
            match day.pred() {
                Some(previous) => day = previous,
                None => break,
            }
        }
        Ok(streak)
    }
}
