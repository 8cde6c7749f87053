//! `SQLite` implementation of the local store

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::local::LocalStore;

use super::Database;

/// Durable key/value cache in a local `SQLite` file.
///
/// Failures never reach the caller: reads degrade to "absent" and writes are
/// logged and dropped.
pub struct SqliteLocalStore {
    conn: Mutex<Connection>,
}

impl SqliteLocalStore {
    /// Open (or create) the store at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    /// Open a throwaway in-memory store
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    fn from_database(database: Database) -> Self {
        Self {
            conn: Mutex::new(database.into_connection()),
        }
    }

    fn read(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|error| Error::Database(error.to_string()))?;
        let value = conn
            .query_row(
                "SELECT value FROM local_store WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self
            .conn
            .lock()
            .map_err(|error| Error::Database(error.to_string()))?;
        conn.execute(
            "INSERT OR REPLACE INTO local_store (key, value, updated_at) VALUES (?, ?, ?)",
            params![key, value, now],
        )?;
        Ok(())
    }
}

impl LocalStore for SqliteLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        match self.read(key) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!("Failed to read local key '{}': {}", key, error);
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) {
        if let Err(error) = self.write(key, value) {
            tracing::warn!("Failed to write local key '{}': {}", key, error);
        }
    }
}
