//! Day-rollover detection and decay application.
//!
//! `check_and_apply` is idempotent within a calendar day: once
//! `last_active_date` equals today, every further invocation is a
//! no-op. The host calls it once per session-open; calling it more
//! often is safe by construction.

use crate::calendar::{days_between, CalendarDay};
use crate::error::{Result, ValidationError};
use crate::ledger::{HistoryUpdate, ScoreLedger};
use crate::model::Settings;
use crate::store::Store;

/// Outcome of one rollover check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecayOutcome {
    pub applied: bool,
    pub is_first_day: bool,
    pub decay: i64,
    pub days_away: i64,
    pub previous_score: Option<i64>,
    pub new_score: Option<i64>,
}

impl DecayOutcome {
    fn skipped(is_first_day: bool) -> Self {
        Self {
            applied: false,
            is_first_day,
            decay: 0,
            days_away: 0,
            previous_score: None,
            new_score: None,
        }
    }
}

/// Penalty for `days_away` days of inactivity. Returns 0 when either
/// input is non-positive.
pub fn calculate_decay(days_away: i64, decay_amount: i64) -> i64 {
    if days_away <= 0 || decay_amount <= 0 {
        0
    } else {
        days_away * decay_amount
    }
}

/// Decay service over the keyed-collection store.
pub struct DecayEngine<'a> {
    store: &'a dyn Store,
}

impl<'a> DecayEngine<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub fn decay_amount(&self) -> Result<i64> {
        Ok(Settings::load(self.store)?.decay_amount)
    }

    /// Set the per-day decay amount. Negative values are rejected.
    pub fn set_decay_amount(&self, amount: i64) -> Result<()> {
        if amount < 0 {
            return Err(ValidationError::NegativeDecayAmount { amount }.into());
        }
        let mut settings = Settings::load(self.store)?;
        settings.decay_amount = amount;
        settings.save(self.store)?;
        Ok(())
    }

    /// Run the rollover state machine for `today`.
    ///
    /// 1. First run ever: initialize `first_use_date` and
    ///    `last_active_date`, no decay.
    /// 2. Still the first day: refresh `last_active_date`, no decay.
    /// 3. Already processed today: no-op.
    /// 4. `days_away == 0` (clock skew): refresh `last_active_date`, no-op.
    /// 5. Otherwise apply `days_away * decay_amount` in one transaction:
    ///    subtract from the score, advance `last_active_date`, merge the
    ///    decay and new score into today's record.
    pub fn check_and_apply(&self, today: CalendarDay) -> Result<DecayOutcome> {
        let mut settings = Settings::load(self.store)?;

        let Some(first_use) = settings.first_use_date else {
            settings.first_use_date = Some(today);
            settings.last_active_date = Some(today);
            settings.save(self.store)?;
            return Ok(DecayOutcome::skipped(true));
        };

        if today == first_use {
            settings.last_active_date = Some(today);
            settings.save(self.store)?;
            return Ok(DecayOutcome::skipped(true));
        }

        let last_active = settings.last_active_date.unwrap_or(first_use);
        if last_active == today {
            return Ok(DecayOutcome::skipped(false));
        }

        let days_away = days_between(last_active, today).max(0);
        if days_away == 0 {
            settings.last_active_date = Some(today);
            settings.save(self.store)?;
            return Ok(DecayOutcome::skipped(false));
        }

        let decay = calculate_decay(days_away, settings.decay_amount);
        let previous_score = ScoreLedger::new(self.store).score()?;
        let mut new_score = previous_score;

        self.store.transaction(&mut |st| {
            let ledger = ScoreLedger::new(st);
            new_score = ledger.subtract_points(decay)?;

            let mut settings = Settings::load(st)?;
            settings.last_active_date = Some(today);
            settings.save(st)?;

            ledger.record_history(
                today,
                HistoryUpdate {
                    date: Some(today),
                    score: Some(new_score),
                    earned: None,
                    decay: Some(decay),
                },
            )?;
            Ok(())
        })?;

        Ok(DecayOutcome {
            applied: true,
            is_first_day: false,
            decay,
            days_away,
            previous_score: Some(previous_score),
            new_score: Some(new_score),
        })
    }
}
