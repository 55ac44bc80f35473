//! Persistent record types for the progression engine.
//!
//! Records are stored as JSON documents in the keyed-collection store,
//! camelCase on the wire. The engine owns the write paths for
//! [`ScoreState`], [`DailyRecord`] and [`AchievementUnlock`];
//! [`Activity`] and [`Completion`] belong to the activity collaborator
//! and are read-only here apart from the completion toggle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarDay;
use crate::error::StoreError;
use crate::store::{Collection, Store, StoreExt};

/// Key of the singleton settings document in the `settings` collection.
pub const SETTINGS_KEY: &str = "settings";

/// Key of the singleton score document in the `settings` collection.
pub const SCORE_KEY: &str = "score";

/// The current score, persisted independently of the history ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreState {
    pub key: String,
    pub value: i64,
}

impl ScoreState {
    pub fn new(value: i64) -> Self {
        Self {
            key: SCORE_KEY.to_string(),
            value,
        }
    }
}

/// One ledger entry per calendar day. `date` is the primary key.
///
/// Created the first time any of earned/decay/score changes that day,
/// merged in place afterwards, and deleted only by a bulk reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: CalendarDay,
    pub score: i64,
    pub earned: i64,
    pub decay: i64,
}

/// Engine settings, a singleton document in the `settings` collection.
///
/// `first_use_date` is set exactly once, at first run. `last_active_date`
/// is updated by the decay engine on every successful rollover check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub key: String,
    pub decay_amount: i64,
    pub first_use_date: Option<CalendarDay>,
    pub last_active_date: Option<CalendarDay>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            key: SETTINGS_KEY.to_string(),
            decay_amount: 0,
            first_use_date: None,
            last_active_date: None,
        }
    }
}

impl Settings {
    /// Load the settings document, falling back to defaults when absent.
    pub fn load(store: &dyn Store) -> Result<Self, StoreError> {
        Ok(store
            .get_as::<Settings>(Collection::Settings, SETTINGS_KEY)?
            .unwrap_or_default())
    }

    pub fn save(&self, store: &dyn Store) -> Result<(), StoreError> {
        store.put_record(Collection::Settings, self)
    }
}

/// An activity the user can complete once per day.
///
/// Owned by the activity collaborator; the engine reads `id`, `points`
/// and `archived` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub name: String,
    pub points: i64,
    pub category_id: Option<String>,
    pub archived: bool,
    pub order: i64,
}

/// A dated completion of one activity.
///
/// Invariant: at most one completion per `(activity_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub id: String,
    pub activity_id: String,
    pub date: CalendarDay,
    pub completed_at: DateTime<Utc>,
}

/// An unlocked achievement. Each id appears at most once, ever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementUnlock {
    pub id: String,
    pub unlocked_at: DateTime<Utc>,
}
