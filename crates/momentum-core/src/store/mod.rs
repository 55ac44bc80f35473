//! Keyed-collection store interface.
//!
//! Every engine operation is expressed against these primitives: `get`,
//! `get_all`, `get_by_index`, `put`, `put_many`, `delete`, plus a
//! multi-record read-write transaction. Records are JSON documents; the
//! key is carried inside the record in the collection's key field.
//!
//! Two implementations ship with the crate: [`MemoryStore`] for tests
//! and ephemeral use, and [`SqliteStore`] for durability.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, StoreError};

/// The five collections the engine operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Settings,
    ScoreHistory,
    Completions,
    Activities,
    Achievements,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Settings,
        Collection::ScoreHistory,
        Collection::Completions,
        Collection::Activities,
        Collection::Achievements,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Settings => "settings",
            Collection::ScoreHistory => "score_history",
            Collection::Completions => "completions",
            Collection::Activities => "activities",
            Collection::Achievements => "achievements",
        }
    }

    /// The record field holding the primary key.
    pub fn key_field(self) -> &'static str {
        match self {
            Collection::Settings => "key",
            Collection::ScoreHistory => "date",
            Collection::Completions => "id",
            Collection::Activities => "id",
            Collection::Achievements => "id",
        }
    }

    /// Secondary indexes the collection declares, by record field name.
    pub fn indexes(self) -> &'static [&'static str] {
        match self {
            Collection::Completions => &["date", "activityId"],
            _ => &[],
        }
    }
}

/// Extract the primary key from a record, or fail with `MissingKey`.
pub(crate) fn record_key(collection: Collection, record: &Value) -> Result<String, StoreError> {
    record
        .get(collection.key_field())
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(StoreError::MissingKey {
            collection: collection.name(),
            key_field: collection.key_field(),
        })
}

/// Keyed-collection store over JSON documents.
///
/// Implementations must provide read-after-write consistency within a
/// single handle: the decay engine's same-day idempotence depends on a
/// `last_active_date` write being visible to the next check.
pub trait Store: Send + Sync {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError>;

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;

    /// All records whose `index` field equals `value`. The index must be
    /// one of [`Collection::indexes`].
    fn get_by_index(
        &self,
        collection: Collection,
        index: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError>;

    /// Insert or replace a record. The key is read from the record's key
    /// field.
    fn put(&self, collection: Collection, record: Value) -> Result<(), StoreError>;

    fn put_many(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        for record in records {
            self.put(collection, record)?;
        }
        Ok(())
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError>;

    /// Run `f` with all-or-nothing semantics: if it returns an error, no
    /// write it performed is visible afterwards.
    fn transaction(
        &self,
        f: &mut dyn FnMut(&dyn Store) -> Result<(), CoreError>,
    ) -> Result<(), CoreError>;
}

/// Typed convenience layer over the JSON primitives.
pub trait StoreExt: Store {
    fn get_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        match self.get(collection, key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn get_all_as<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StoreError> {
        self.get_all(collection)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    fn get_by_index_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        index: &str,
        value: &Value,
    ) -> Result<Vec<T>, StoreError> {
        self.get_by_index(collection, index, value)?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(StoreError::from))
            .collect()
    }

    fn put_record<T: Serialize>(
        &self,
        collection: Collection,
        record: &T,
    ) -> Result<(), StoreError> {
        self.put(collection, serde_json::to_value(record)?)
    }
}

impl<S: Store + ?Sized> StoreExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_fields() {
        assert_eq!(Collection::Settings.key_field(), "key");
        assert_eq!(Collection::ScoreHistory.key_field(), "date");
        assert_eq!(Collection::Completions.key_field(), "id");
    }

    #[test]
    fn test_record_key_extraction() {
        let record = json!({ "date": "2025-01-01", "score": 3 });
        assert_eq!(
            record_key(Collection::ScoreHistory, &record).unwrap(),
            "2025-01-01"
        );
    }

    #[test]
    fn test_record_key_missing() {
        let record = json!({ "score": 3 });
        let err = record_key(Collection::ScoreHistory, &record).unwrap_err();
        assert!(matches!(err, StoreError::MissingKey { .. }));
    }

    #[test]
    fn test_only_completions_declare_indexes() {
        for collection in Collection::ALL {
            if collection == Collection::Completions {
                assert_eq!(collection.indexes(), &["date", "activityId"]);
            } else {
                assert!(collection.indexes().is_empty());
            }
        }
    }
}
