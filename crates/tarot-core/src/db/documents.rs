//! `SQLite` implementation of the document store for device-local profiles

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Error, Result};
use crate::models::{DocumentPatch, UserDocument};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};

use super::Database;

/// Uid of the profile used when no remote project is configured
pub const LOCAL_PROFILE_UID: &str = "local";

/// User documents kept in the local `SQLite` file.
///
/// Stands in for the remote store when the app runs without a remote
/// project, so a device-local profile keeps its spreads between runs. Each
/// document is stored as one JSON value; saves apply the patch the same way
/// the remote upsert does.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_database(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    fn from_database(database: Database) -> Self {
        Self {
            conn: Arc::new(Mutex::new(database.into_connection())),
        }
    }

    async fn with_connection<T, F>(&self, operation: F) -> RemoteResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let result = tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|error| Error::Database(error.to_string()))?;
            operation(&conn)
        })
        .await
        .map_err(|error| RemoteError::Unavailable(error.to_string()))?;
        result.map_err(|error| RemoteError::Unavailable(error.to_string()))
    }
}

fn read_document(conn: &Connection, uid: &str) -> Result<Option<UserDocument>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT document FROM user_documents WHERE user_id = ?",
            params![uid],
            |row| row.get(0),
        )
        .optional()?;
    raw.map(|raw| serde_json::from_str(&raw).map_err(Error::from))
        .transpose()
}

fn write_document(conn: &Connection, uid: &str, document: &UserDocument) -> Result<()> {
    let raw = serde_json::to_string(document)?;
    conn.execute(
        "INSERT OR REPLACE INTO user_documents (user_id, document, updated_at) VALUES (?, ?, ?)",
        params![uid, raw, Utc::now().timestamp_millis()],
    )?;
    Ok(())
}

#[async_trait]
impl RemoteStore for SqliteDocumentStore {
    async fn load_user_document(&self, uid: &str) -> RemoteResult<Option<UserDocument>> {
        let uid = uid.to_string();
        self.with_connection(move |conn| read_document(conn, &uid))
            .await
    }

    async fn save_user_document(&self, uid: &str, patch: &DocumentPatch) -> RemoteResult<()> {
        let uid = uid.to_string();
        let patch = patch.clone();
        self.with_connection(move |conn| {
            let now = Utc::now();
            let mut document = read_document(conn, &uid)?.unwrap_or_else(|| UserDocument {
                created_at: Some(now),
                ..UserDocument::default()
            });
            patch.apply_to(&mut document, now);
            write_document(conn, &uid, &document)
        })
        .await
    }

    async fn create_user_document(&self, uid: &str, document: &UserDocument) -> RemoteResult<()> {
        let uid = uid.to_string();
        let document = document.clone();
        self.with_connection(move |conn| write_document(conn, &uid, &document))
            .await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::models::{FavoriteSet, NoteMap};

    #[tokio::test]
    async fn missing_document_loads_as_none() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        assert_eq!(store.load_user_document(LOCAL_PROFILE_UID).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_merges_top_level_fields() {
        let store = SqliteDocumentStore::open_in_memory().unwrap();
        let document = UserDocument::seeded(
            FavoriteSet::from([1]),
            NoteMap::from([(2, "keep".to_string())]),
            Vec::new(),
        );
        store.create_user_document("u1", &document).await.unwrap();

        store
            .save_user_document("u1", &DocumentPatch::favorites(FavoriteSet::from([7, 8])))
            .await
            .unwrap();

        let loaded = store.load_user_document("u1").await.unwrap().unwrap();
        assert_eq!(loaded.favorites, FavoriteSet::from([7, 8]));
        assert_eq!(loaded.notes, document.notes);
        assert_eq!(loaded.created_at, document.created_at);
        assert!(loaded.updated_at >= document.updated_at);
    }

    #[tokio::test]
    async fn documents_survive_reopen() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("local.db");

        {
            let store = SqliteDocumentStore::open(&path).unwrap();
            store
                .save_user_document(
                    LOCAL_PROFILE_UID,
                    &DocumentPatch::notes(NoteMap::from([(0, "fool".to_string())])),
                )
                .await
                .unwrap();
        }

        let reopened = SqliteDocumentStore::open(&path).unwrap();
        let loaded = reopened
            .load_user_document(LOCAL_PROFILE_UID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.notes.get(&0).map(String::as_str), Some("fool"));
        assert!(loaded.created_at.is_some());
    }
}
