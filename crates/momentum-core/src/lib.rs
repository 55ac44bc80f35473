//! # Momentum Core Library
//!
//! This library provides the score ledger and progression engine for
//! Momentum, a single-user habit-gamification app. It turns a stream of
//! dated activity completions into a running score, applies a
//! calendar-driven decay penalty for inactivity exactly once per day,
//! and evaluates milestone/streak achievements idempotently.
//!
//! ## Architecture
//!
//! - **Score Ledger**: the current score plus a per-day history record
//!   with merge-on-write upserts
//! - **Decay Engine**: day-rollover detection, idempotent within a
//!   calendar day; purely reactive, triggered by the host on session
//!   start
//! - **Streak Calculators**: three backward scans with distinct gap
//!   semantics
//! - **Achievement Engine**: a static rule table and an unlock-if-absent
//!   evaluator
//! - **Storage**: a keyed-collection store abstraction with in-memory
//!   and SQLite implementations
//!
//! The host drives the engine: call [`DecayEngine::check_and_apply`]
//! once per session-open, toggle completions through
//! [`CompletionTracker`], and run
//! [`AchievementEngine::check_for_new`] after every score-affecting
//! mutation (supplying the pre-mutation score whenever it could have
//! crossed zero).
//!
//! ## Key Components
//!
//! - [`ScoreLedger`]: score and history writes
//! - [`DecayEngine`]: rollover state machine
//! - [`StreakCalculator`]: successful-day, perfect-day and completion
//!   streaks
//! - [`AchievementEngine`]: unlock evaluation and progress previews
//! - [`Store`]: persistence boundary, with [`MemoryStore`] and
//!   [`SqliteStore`]

pub mod achievements;
pub mod calendar;
pub mod decay;
pub mod error;
pub mod ledger;
pub mod model;
pub mod store;
pub mod streaks;
pub mod tracker;

pub use achievements::{
    check_recovery_condition, AchievementDefinition, AchievementEngine, AchievementKind,
    AchievementProgress, CheckContext, KindProgress, PerfectWeekProgress, DEFINITIONS,
    PERFECT_WEEK_TARGET,
};
pub use calendar::{days_between, today, CalendarDay};
pub use decay::{calculate_decay, DecayEngine, DecayOutcome};
pub use error::{CoreError, NotFoundError, Result, StoreError, ValidationError};
pub use ledger::{
    merge_daily_record, BreakEvenStatus, HistoryUpdate, ResetOptions, ResetSummary, ScoreLedger,
};
pub use model::{
    Activity, AchievementUnlock, Completion, DailyRecord, ScoreState, Settings, SCORE_KEY,
    SETTINGS_KEY,
};
pub use store::{Collection, MemoryStore, SqliteStore, Store, StoreExt};
pub use streaks::{StreakCalculator, PERFECT_STREAK_LOOKBACK_DAYS};
pub use tracker::{CompletionTracker, ToggleOutcome};
