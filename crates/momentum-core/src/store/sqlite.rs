//! SQLite-backed store.
//!
//! One table per collection, each holding the primary key plus the full
//! JSON document. Completions additionally get dedicated indexed
//! columns for their secondary indexes, and a unique index enforcing
//! the one-completion-per-activity-per-day invariant at the storage
//! layer as well.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{CoreError, StoreError};

use super::{record_key, Collection, Store};

/// Returns `~/.config/momentum[-dev]/` based on MOMENTUM_ENV.
///
/// Set MOMENTUM_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, StoreError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("MOMENTUM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("momentum-dev")
    } else {
        base_dir.join("momentum")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Durable keyed-collection store over SQLite.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open the store at `~/.config/momentum/momentum.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, StoreError> {
        let path = data_dir()?.join("momentum.db");
        let conn =
            Connection::open(&path).map_err(|source| StoreError::OpenFailed { path, source })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open the store at an explicit path.
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let conn =
            Connection::open(&path).map_err(|source| StoreError::OpenFailed { path, source })?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Open an in-memory store (for tests).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Locked)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS settings (
                key    TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS score_history (
                date   TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS completions (
                id          TEXT PRIMARY KEY,
                activity_id TEXT NOT NULL,
                date        TEXT NOT NULL,
                record      TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS activities (
                id     TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS achievements (
                id     TEXT PRIMARY KEY,
                record TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_completions_date ON completions(date);
            CREATE INDEX IF NOT EXISTS idx_completions_activity_id ON completions(activity_id);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_completions_activity_date
                ON completions(activity_id, date);",
        )?;
        Ok(())
    }

    /// Map a record index field to its table column.
    fn index_column(collection: Collection, index: &str) -> Result<&'static str, StoreError> {
        match (collection, index) {
            (Collection::Completions, "date") => Ok("date"),
            (Collection::Completions, "activityId") => Ok("activity_id"),
            _ => Err(StoreError::UnknownIndex {
                collection: collection.name(),
                index: index.to_string(),
            }),
        }
    }

    fn required_str(record: &Value, field: &str) -> Result<String, StoreError> {
        record
            .get(field)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                StoreError::QueryFailed(format!("completion record missing field '{field}'"))
            })
    }
}

impl Store for SqliteStore {
    fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT record FROM {} WHERE {} = ?1",
            collection.name(),
            collection.key_field()
        );
        let json: Option<String> = conn
            .query_row(&sql, params![key], |row| row.get(0))
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn get_all(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT record FROM {} ORDER BY {}",
            collection.name(),
            collection.key_field()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn get_by_index(
        &self,
        collection: Collection,
        index: &str,
        value: &Value,
    ) -> Result<Vec<Value>, StoreError> {
        let column = Self::index_column(collection, index)?;
        let needle = value
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string());

        let conn = self.conn()?;
        let sql = format!(
            "SELECT record FROM {} WHERE {} = ?1 ORDER BY {}",
            collection.name(),
            column,
            collection.key_field()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![needle], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn put(&self, collection: Collection, record: Value) -> Result<(), StoreError> {
        let key = record_key(collection, &record)?;
        let json = record.to_string();
        let conn = self.conn()?;

        match collection {
            Collection::Completions => {
                let activity_id = Self::required_str(&record, "activityId")?;
                let date = Self::required_str(&record, "date")?;
                conn.execute(
                    "INSERT INTO completions (id, activity_id, date, record)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                        activity_id = ?2, date = ?3, record = ?4",
                    params![key, activity_id, date, json],
                )?;
            }
            _ => {
                let sql = format!(
                    "INSERT INTO {table} ({key_field}, record) VALUES (?1, ?2)
                     ON CONFLICT({key_field}) DO UPDATE SET record = ?2",
                    table = collection.name(),
                    key_field = collection.key_field()
                );
                conn.execute(&sql, params![key, json])?;
            }
        }
        Ok(())
    }

    fn put_many(&self, collection: Collection, records: Vec<Value>) -> Result<(), StoreError> {
        self.conn()?.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        let result: Result<(), StoreError> = (|| {
            for record in records {
                self.put(collection, record)?;
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.conn()?.execute_batch("COMMIT;")?;
                Ok(())
            }
            Err(err) => {
                if let Ok(conn) = self.conn() {
                    let _ = conn.execute_batch("ROLLBACK;");
                }
                Err(err)
            }
        }
    }

    fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            collection.name(),
            collection.key_field()
        );
        conn.execute(&sql, params![key])?;
        Ok(())
    }

    fn transaction(
        &self,
        f: &mut dyn FnMut(&dyn Store) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        self.conn()?
            .execute_batch("BEGIN IMMEDIATE TRANSACTION;")
            .map_err(StoreError::from)?;
        match f(self) {
            Ok(()) => {
                self.conn()?
                    .execute_batch("COMMIT;")
                    .map_err(StoreError::from)?;
                Ok(())
            }
            Err(err) => {
                if let Ok(conn) = self.conn() {
                    let _ = conn.execute_batch("ROLLBACK;");
                }
                Err(err)
            }
        }
    }
}
