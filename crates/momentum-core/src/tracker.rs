//! Completion toggling with a single in-flight guard.
//!
//! Toggling the same activity twice in rapid succession must not
//! interleave: the second request is dropped while the first is still
//! writing, otherwise the earned/score bookkeeping would be applied
//! twice. The guard is an explicit flag, not an assumption about
//! run-to-completion scheduling.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::calendar::CalendarDay;
use crate::error::{NotFoundError, Result, ValidationError};
use crate::ledger::ScoreLedger;
use crate::model::{Activity, Completion};
use crate::store::{Collection, Store, StoreExt};

/// Result of one toggle request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A completion was recorded and points were awarded.
    Completed {
        completion: Completion,
        new_score: i64,
    },
    /// An existing completion was removed and its points taken back.
    Removed { new_score: i64 },
    /// Another toggle was in flight; this request was dropped.
    Ignored,
}

/// Completion toggle service over the keyed-collection store.
pub struct CompletionTracker<'a> {
    store: &'a dyn Store,
    toggling: AtomicBool,
}

impl<'a> CompletionTracker<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            toggling: AtomicBool::new(false),
        }
    }

    /// The completion for `(activity_id, date)`, if one exists.
    pub fn completion_on(
        &self,
        activity_id: &str,
        date: CalendarDay,
    ) -> Result<Option<Completion>> {
        let completions: Vec<Completion> = self.store.get_by_index_as(
            Collection::Completions,
            "activityId",
            &json!(activity_id),
        )?;
        Ok(completions.into_iter().find(|c| c.date == date))
    }

    /// Total completions across all activities, all time.
    pub fn completion_count(&self) -> Result<usize> {
        Ok(self.store.get_all(Collection::Completions)?.len())
    }

    /// Toggle `activity_id` for `today`.
    ///
    /// On: insert a completion, add the activity's points, add them to
    /// today's earned total. Off: the inverse. All writes of one toggle
    /// run in a single transaction. A request arriving while another
    /// toggle is in flight returns [`ToggleOutcome::Ignored`].
    pub fn toggle(&self, today: CalendarDay, activity_id: &str) -> Result<ToggleOutcome> {
        if self
            .toggling
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Acquire)
            .is_err()
        {
            return Ok(ToggleOutcome::Ignored);
        }
        let result = self.toggle_locked(today, activity_id);
        self.toggling.store(false, Ordering::Release);
        result
    }

    fn toggle_locked(&self, today: CalendarDay, activity_id: &str) -> Result<ToggleOutcome> {
        let activity: Activity = self
            .store
            .get_as(Collection::Activities, activity_id)?
            .ok_or_else(|| NotFoundError::Activity(activity_id.to_string()))?;

        if activity.points < 1 {
            return Err(ValidationError::NonPositivePoints {
                activity_id: activity.id,
                points: activity.points,
            }
            .into());
        }

        let existing = self.completion_on(activity_id, today)?;
        let mut outcome = ToggleOutcome::Ignored;

        self.store.transaction(&mut |st| {
            let ledger = ScoreLedger::new(st);
            match &existing {
                Some(completion) => {
                    st.delete(Collection::Completions, &completion.id)?;
                    let new_score = ledger.subtract_points(activity.points)?;
                    ledger.add_earned_today(today, -activity.points)?;
                    outcome = ToggleOutcome::Removed { new_score };
                }
                None => {
                    // Surfaces a racing duplicate that slipped past the
                    // pre-check.
                    let tracker = CompletionTracker::new(st);
                    if tracker.completion_on(activity_id, today)?.is_some() {
                        return Err(ValidationError::DuplicateCompletion {
                            activity_id: activity_id.to_string(),
                            date: today,
                        }
                        .into());
                    }

                    let completion = Completion {
                        id: Uuid::new_v4().to_string(),
                        activity_id: activity_id.to_string(),
                        date: today,
                        completed_at: Utc::now(),
                    };
                    st.put_record(Collection::Completions, &completion)?;
                    let new_score = ledger.add_points(activity.points)?;
                    ledger.add_earned_today(today, activity.points)?;
                    outcome = ToggleOutcome::Completed {
                        completion,
                        new_score,
                    };
                }
            }
            Ok(())
        })?;

        Ok(outcome)
    }

    #[cfg(test)]
    fn set_toggling(&self, value: bool) {
        self.toggling.store(value, Ordering::Release);
    }
}
