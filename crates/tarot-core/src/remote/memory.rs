use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{RemoteError, RemoteResult, RemoteStore};
use crate::models::{DocumentPatch, UserDocument};

/// In-process remote store keyed by uid.
///
/// `set_available(false)` makes every call fail with `Unavailable`, which is
/// how tests and local demos simulate a network outage.
#[derive(Debug)]
pub struct MemoryRemoteStore {
    documents: Mutex<HashMap<String, UserDocument>>,
    available: AtomicBool,
    saves: AtomicUsize,
}

impl Default for MemoryRemoteStore {
    fn default() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            saves: AtomicUsize::new(0),
        }
    }
}

impl MemoryRemoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a user's document
    #[must_use]
    pub fn with_document(self, uid: &str, document: UserDocument) -> Self {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(uid.to_string(), document);
        }
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Snapshot of a stored document
    #[must_use]
    pub fn document(&self, uid: &str) -> Option<UserDocument> {
        self.documents.lock().ok()?.get(uid).cloned()
    }

    /// Number of successful `save_user_document` calls
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> RemoteResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Unavailable("memory store offline".to_string()))
        }
    }

    fn documents(&self) -> RemoteResult<std::sync::MutexGuard<'_, HashMap<String, UserDocument>>> {
        self.documents
            .lock()
            .map_err(|error| RemoteError::Unavailable(error.to_string()))
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn load_user_document(&self, uid: &str) -> RemoteResult<Option<UserDocument>> {
        self.ensure_available()?;
        Ok(self.documents()?.get(uid).cloned())
    }

    async fn save_user_document(&self, uid: &str, patch: &DocumentPatch) -> RemoteResult<()> {
        self.ensure_available()?;
        let now = Utc::now();
        let mut documents = self.documents()?;
        let document = documents.entry(uid.to_string()).or_insert_with(|| UserDocument {
            created_at: Some(now),
            ..UserDocument::default()
        });
        patch.apply_to(document, now);
        drop(documents);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_user_document(&self, uid: &str, document: &UserDocument) -> RemoteResult<()> {
        self.ensure_available()?;
        self.documents()?.insert(uid.to_string(), document.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::FavoriteSet;

    #[tokio::test]
    async fn missing_document_loads_as_none() {
        let store = MemoryRemoteStore::new();
        assert_eq!(store.load_user_document("u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_replaces_only_present_fields() {
        let mut initial = UserDocument::default();
        initial.notes.insert(1, "keep".to_string());
        initial.favorites.insert(9);
        let store = MemoryRemoteStore::new().with_document("u1", initial);

        store
            .save_user_document("u1", &DocumentPatch::favorites(FavoriteSet::from([2, 3])))
            .await
            .unwrap();

        let document = store.document("u1").unwrap();
        assert_eq!(document.favorites, FavoriteSet::from([2, 3]));
        assert_eq!(document.notes.get(&1).map(String::as_str), Some("keep"));
        assert!(document.updated_at.is_some());
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn offline_store_reports_unavailable() {
        let store = MemoryRemoteStore::new();
        store.set_available(false);
        let error = store.load_user_document("u1").await.unwrap_err();
        assert!(matches!(error, RemoteError::Unavailable(_)));
        assert!(store
            .create_user_document("u1", &UserDocument::default())
            .await
            .is_err());

        store.set_available(true);
        assert!(store.load_user_document("u1").await.is_ok());
    }
}
