//! Score ledger: current score plus the per-day history record.
//!
//! The ledger is the only writer of [`ScoreState`] and [`DailyRecord`].
//! History writes are merge-on-write upserts: fields left unspecified
//! keep the prior record's value, then fall back to 0 (earned/decay) or
//! the live score. The merge itself is the pure function
//! [`merge_daily_record`] so the coupling between `add_earned_today`
//! and the live score stays auditable in isolation.

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarDay;
use crate::error::Result;
use crate::model::{DailyRecord, ScoreState, Settings, SCORE_KEY};
use crate::store::{Collection, Store, StoreExt};

/// A partial history write. `None` fields resolve against the existing
/// record, then against the defaults described on [`merge_daily_record`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoryUpdate {
    pub date: Option<CalendarDay>,
    pub score: Option<i64>,
    pub earned: Option<i64>,
    pub decay: Option<i64>,
}

/// Resolve a partial update against the existing record for `date`.
///
/// Precedence per field: update value, then existing record value, then
/// the default — `fallback_score` for `score`, `0` for earned/decay.
pub fn merge_daily_record(
    existing: Option<&DailyRecord>,
    update: &HistoryUpdate,
    date: CalendarDay,
    fallback_score: i64,
) -> DailyRecord {
    DailyRecord {
        date,
        score: update
            .score
            .or(existing.map(|r| r.score))
            .unwrap_or(fallback_score),
        earned: update.earned.or(existing.map(|r| r.earned)).unwrap_or(0),
        decay: update.decay.or(existing.map(|r| r.decay)).unwrap_or(0),
    }
}

/// Today's earned points measured against the configured decay amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEvenStatus {
    pub break_even: bool,
    pub remaining: i64,
    pub surplus: i64,
    pub percent: i64,
}

/// Which collections a bulk reset clears.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub history: bool,
    pub score: bool,
    pub completions: bool,
    pub achievements: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetSummary {
    pub deleted_history_records: usize,
    pub deleted_completions: usize,
    pub deleted_achievements: usize,
    pub score_reset: bool,
}

/// Ledger service over the keyed-collection store.
pub struct ScoreLedger<'a> {
    store: &'a dyn Store,
}

impl<'a> ScoreLedger<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Current score; 0 when never written.
    pub fn score(&self) -> Result<i64> {
        Ok(self
            .store
            .get_as::<ScoreState>(Collection::Settings, SCORE_KEY)?
            .map(|s| s.value)
            .unwrap_or(0))
    }

    /// Replace the current score. Negative values are allowed.
    pub fn set_score(&self, value: i64) -> Result<()> {
        self.store
            .put_record(Collection::Settings, &ScoreState::new(value))?;
        Ok(())
    }

    /// Add `delta` to the score and return the new value.
    pub fn add_points(&self, delta: i64) -> Result<i64> {
        let value = self.score()? + delta;
        self.set_score(value)?;
        Ok(value)
    }

    /// Subtract `delta` from the score and return the new value.
    pub fn subtract_points(&self, delta: i64) -> Result<i64> {
        self.add_points(-delta)
    }

    /// The record for `date`, if any.
    pub fn record_on(&self, date: CalendarDay) -> Result<Option<DailyRecord>> {
        Ok(self
            .store
            .get_as(Collection::ScoreHistory, &date.to_string())?)
    }

    /// All history records, ascending by date.
    pub fn history(&self) -> Result<Vec<DailyRecord>> {
        Ok(self.store.get_all_as(Collection::ScoreHistory)?)
    }

    /// Upsert a daily record; `update.date` defaults to `today`.
    pub fn record_history(&self, today: CalendarDay, update: HistoryUpdate) -> Result<DailyRecord> {
        let date = update.date.unwrap_or(today);
        let existing = self.record_on(date)?;
        let fallback_score = self.score()?;
        let merged = merge_daily_record(existing.as_ref(), &update, date, fallback_score);
        self.store.put_record(Collection::ScoreHistory, &merged)?;
        Ok(merged)
    }

    /// Add `points` to today's earned total and stamp the record with
    /// the live score.
    ///
    /// Callers must mutate the score for the same event first: the
    /// record's `score` field is read from ScoreState at write time.
    pub fn add_earned_today(&self, today: CalendarDay, points: i64) -> Result<DailyRecord> {
        let prior_earned = self
            .record_on(today)?
            .map(|r| r.earned)
            .unwrap_or(0);
        let current_score = self.score()?;
        self.record_history(
            today,
            HistoryUpdate {
                date: Some(today),
                score: Some(current_score),
                earned: Some((prior_earned + points).max(0)),
                decay: None,
            },
        )
    }

    /// Today's earned points measured against the decay amount.
    ///
    /// `percent` is 100 when no decay is configured, otherwise
    /// `min(100, round(earned / decay * 100))`.
    pub fn break_even_status(&self, today: CalendarDay) -> Result<BreakEvenStatus> {
        let earned = self.record_on(today)?.map(|r| r.earned).unwrap_or(0);
        let decay = Settings::load(self.store)?.decay_amount;

        let percent = if decay <= 0 {
            100
        } else {
            let ratio = (earned as f64 / decay as f64) * 100.0;
            (ratio.round() as i64).min(100)
        };

        Ok(BreakEvenStatus {
            break_even: earned >= decay,
            remaining: (decay - earned).max(0),
            surplus: (earned - decay).max(0),
            percent,
        })
    }

    /// Maximum over all recorded daily scores and the current score.
    pub fn highest_score(&self) -> Result<i64> {
        let current = self.score()?;
        Ok(self
            .history()?
            .iter()
            .map(|r| r.score)
            .fold(current, i64::max))
    }

    /// Minimum over all recorded daily scores and the current score.
    pub fn lowest_score(&self) -> Result<i64> {
        let current = self.score()?;
        Ok(self
            .history()?
            .iter()
            .map(|r| r.score)
            .fold(current, i64::min))
    }

    /// Bulk reset: the only path that deletes history records.
    ///
    /// Runs in a single transaction; partial failure leaves everything
    /// in place.
    pub fn reset(&self, options: ResetOptions) -> Result<ResetSummary> {
        let mut summary = ResetSummary::default();

        self.store.transaction(&mut |st| {
            if options.history {
                for record in st.get_all(Collection::ScoreHistory)? {
                    if let Some(date) = record.get("date").and_then(|v| v.as_str()) {
                        st.delete(Collection::ScoreHistory, date)?;
                        summary.deleted_history_records += 1;
                    }
                }
            }
            if options.completions {
                for record in st.get_all(Collection::Completions)? {
                    if let Some(id) = record.get("id").and_then(|v| v.as_str()) {
                        st.delete(Collection::Completions, id)?;
                        summary.deleted_completions += 1;
                    }
                }
            }
            if options.achievements {
                for record in st.get_all(Collection::Achievements)? {
                    if let Some(id) = record.get("id").and_then(|v| v.as_str()) {
                        st.delete(Collection::Achievements, id)?;
                        summary.deleted_achievements += 1;
                    }
                }
            }
            if options.score {
                ScoreLedger::new(st).set_score(0)?;
                summary.score_reset = true;
            }
            Ok(())
        })?;

        Ok(summary)
    }
}
