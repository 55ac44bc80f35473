//! Core error types for momentum-core.
//!
//! This module defines the error hierarchy using thiserror. Engine
//! operations fail fast with a typed error naming the violated
//! invariant; validation failures never leave a partial mutation behind.

use std::path::PathBuf;
use thiserror::Error;

use crate::calendar::CalendarDay;

/// Core error type for momentum-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Lookup errors
    #[error("Not found: {0}")]
    NotFound(#[from] NotFoundError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the keyed-collection store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Store is locked by another handle
    #[error("Store is locked")]
    Locked,

    /// Record serialization failed
    #[error("Record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Record is missing its key field
    #[error("Record for collection '{collection}' is missing its key field '{key_field}'")]
    MissingKey {
        collection: &'static str,
        key_field: &'static str,
    },

    /// Queried an index the collection does not declare
    #[error("Collection '{collection}' has no index '{index}'")]
    UnknownIndex {
        collection: &'static str,
        index: String,
    },

    /// IO errors (data directory creation)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Validation errors. No mutation is performed when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Decay amount must be non-negative
    #[error("Decay amount must be >= 0, got {amount}")]
    NegativeDecayAmount { amount: i64 },

    /// Activity point values must be >= 1
    #[error("Activity '{activity_id}' has non-positive points: {points}")]
    NonPositivePoints { activity_id: String, points: i64 },

    /// At most one completion per activity per day
    #[error("Activity '{activity_id}' already has a completion on {date}")]
    DuplicateCompletion {
        activity_id: String,
        date: CalendarDay,
    },
}

/// Lookup errors for ids referencing missing records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// No activity with this id
    #[error("Activity not found: {0}")]
    Activity(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
