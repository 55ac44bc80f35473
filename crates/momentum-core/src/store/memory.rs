//! In-memory store for tests and ephemeral sessions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{CoreError, StoreError};

use super::{record_key, Collection, Store};

type Collections = HashMap<Collection, BTreeMap<String, Value>>;

/// Keyed-collection store backed by in-process maps.
///
/// Transactions snapshot the maps and restore them on error.
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut collections = Collections::new();
        for collection in Collection::ALL {
            collections.insert(collection, BTreeMap::new());
        }
        Self {
            inner: Mutex::new(collections),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Collections>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Locked)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .get(&collection)
            .and_then(|records| records.get(key))
            .cloned())
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .get(&collection)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get_by_index(
        &self,
        collection: Collection,
        index: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        if !collection.indexes().contains(&index) {
            return Err(StoreError::UnknownIndex {
                collection: collection.name(),
                index: index.to_string(),
            });
        }
        let inner = self.lock()?;
        Ok(inner
            .get(&collection)
            .map(|records| {
                records
                    .values()
                    .filter(|record| record.get(index) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn put(&self, collection: Collection, record: Value) -> Result<(), StoreError> {
        let key = record_key(collection, &record)?;
        let mut inner = self.lock()?;
        inner.entry(collection).or_default().insert(key, record);
        Ok(())
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(records) = inner.get_mut(&collection) {
            records.remove(key);
        }
        Ok(())
    }

    fn transaction(
        &self,
        f: &mut dyn FnMut(&dyn Store) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        let snapshot = self.lock()?.clone();
        match f(self) {
            Ok(()) => Ok(()),
            Err(err) => {
                *self.lock()? = snapshot;
                Err(err)
            }
        }
    }
}
