//! Local store: a durable per-device key/value cache.
//!
//! Synchronous and infallible from the caller's point of view. Only favorites
//! and notes are mirrored here; spreads live in the remote store alone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::models::{FavoriteSet, NoteMap};

/// Key holding the favorites JSON array
pub const FAVORITES_KEY: &str = "favoriteTarotCards";
/// Key holding the notes JSON object
pub const NOTES_KEY: &str = "tarotCardNotes";

/// Raw string key/value storage
pub trait LocalStore: Send + Sync {
    /// Read a raw value; absent on missing key or read failure
    fn get(&self, key: &str) -> Option<String>;

    /// Write a raw value; failures are handled by the implementation
    fn set(&self, key: &str, value: &str);
}

pub type SharedLocalStore = Arc<dyn LocalStore>;

/// A cached value could not be decoded
#[derive(Debug, Error)]
#[error("Corrupted local value for '{key}': {source}")]
pub struct LocalParseError {
    pub key: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// In-process store, used in tests and for ephemeral sessions
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a key
    #[must_use]
    pub fn with_value(self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }
}

impl LocalStore for MemoryLocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value.to_string());
        }
    }
}

/// Typed access to the favorites and notes keys
#[derive(Clone)]
pub struct LocalCache {
    store: SharedLocalStore,
}

impl LocalCache {
    pub fn new(store: SharedLocalStore) -> Self {
        Self { store }
    }

    /// Cached favorites; a missing key is an empty set
    pub fn read_favorites(&self) -> Result<FavoriteSet, LocalParseError> {
        self.read_json(FAVORITES_KEY)
    }

    /// Cached notes; a missing key is an empty map
    pub fn read_notes(&self) -> Result<NoteMap, LocalParseError> {
        self.read_json(NOTES_KEY)
    }

    /// Cached favorites, discarding a corrupted value
    pub fn favorites_or_empty(&self) -> FavoriteSet {
        self.read_favorites().unwrap_or_else(|error| {
            tracing::warn!("{}; treating as empty", error);
            FavoriteSet::new()
        })
    }

    /// Cached notes, discarding a corrupted value
    pub fn notes_or_empty(&self) -> NoteMap {
        self.read_notes().unwrap_or_else(|error| {
            tracing::warn!("{}; treating as empty", error);
            NoteMap::new()
        })
    }

    pub fn write_favorites(&self, favorites: &FavoriteSet) {
        self.write_json(FAVORITES_KEY, favorites);
    }

    pub fn write_notes(&self, notes: &NoteMap) {
        self.write_json(NOTES_KEY, notes);
    }

    fn read_json<T: DeserializeOwned + Default>(
        &self,
        key: &'static str,
    ) -> Result<T, LocalParseError> {
        match self.store.get(key) {
            None => Ok(T::default()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| LocalParseError { key, source }),
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.store.set(key, &raw),
            Err(error) => tracing::warn!("Failed to encode local value '{}': {}", key, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn cache_with(store: MemoryLocalStore) -> (Arc<MemoryLocalStore>, LocalCache) {
        let store = Arc::new(store);
        let cache = LocalCache::new(store.clone());
        (store, cache)
    }

    #[test]
    fn missing_keys_read_as_empty() {
        let (_, cache) = cache_with(MemoryLocalStore::new());
        assert!(cache.read_favorites().unwrap().is_empty());
        assert!(cache.read_notes().unwrap().is_empty());
    }

    #[test]
    fn favorites_are_written_as_json_array() {
        let (store, cache) = cache_with(MemoryLocalStore::new());
        cache.write_favorites(&FavoriteSet::from([5]));
        assert_eq!(store.get(FAVORITES_KEY).as_deref(), Some("[5]"));
        assert_eq!(cache.read_favorites().unwrap(), FavoriteSet::from([5]));
    }

    #[test]
    fn notes_are_written_with_string_keys() {
        let (store, cache) = cache_with(MemoryLocalStore::new());
        cache.write_notes(&NoteMap::from([(12, "pause".to_string())]));
        assert_eq!(store.get(NOTES_KEY).as_deref(), Some(r#"{"12":"pause"}"#));
    }

    #[test]
    fn corrupted_value_is_a_parse_error() {
        let (_, cache) =
            cache_with(MemoryLocalStore::new().with_value(FAVORITES_KEY, "not json"));
        let error = cache.read_favorites().unwrap_err();
        assert_eq!(error.key, FAVORITES_KEY);
        assert!(cache.favorites_or_empty().is_empty());
    }

    #[test]
    fn corrupted_notes_recover_as_empty() {
        let (_, cache) = cache_with(MemoryLocalStore::new().with_value(NOTES_KEY, "[1,2]"));
        assert!(cache.read_notes().is_err());
        assert!(cache.notes_or_empty().is_empty());
    }
}
