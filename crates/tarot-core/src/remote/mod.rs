//! Remote store client: one cloud document per user.
//!
//! Writes replace whole top-level fields (favorites, notes, spreads); there is
//! no field-level delta and no conflict resolution. Last writer wins.

mod memory;
mod supabase;

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{DocumentPatch, UserDocument};

pub use memory::MemoryRemoteStore;
pub(crate) use supabase::{Bearer, PostgrestClient};
pub use supabase::SupabaseDocumentStore;

/// Failures talking to the remote store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network or provider failure
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),
    /// No access token for an authenticated request
    #[error("Remote store request is not authenticated")]
    Unauthenticated,
}

pub type RemoteResult<T> = Result<T, RemoteError>;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch the user's document; `None` when it was never created
    async fn load_user_document(&self, uid: &str) -> RemoteResult<Option<UserDocument>>;

    /// Merge the present fields of `patch` into the user's document
    async fn save_user_document(&self, uid: &str, patch: &DocumentPatch) -> RemoteResult<()>;

    /// Create the user's document; called only after a load found none
    async fn create_user_document(&self, uid: &str, document: &UserDocument) -> RemoteResult<()>;
}

pub type SharedRemoteStore = Arc<dyn RemoteStore>;

/// Current bearer token shared between the auth flow and remote clients
#[derive(Clone, Default)]
pub struct AccessToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl AccessToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut guard) = self.inner.write() {
            *guard = token;
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner.read().ok().and_then(|guard| guard.clone())
    }

    pub(crate) fn require(&self) -> RemoteResult<String> {
        self.get().ok_or(RemoteError::Unauthenticated)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.get().is_some() { "[REDACTED]" } else { "none" };
        f.debug_tuple("AccessToken").field(&state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_is_shared_between_clones() {
        let token = AccessToken::new();
        let clone = token.clone();
        assert_eq!(clone.require(), Err(RemoteError::Unauthenticated));

        token.set(Some("jwt".to_string()));
        assert_eq!(clone.get().as_deref(), Some("jwt"));
        assert!(!format!("{clone:?}").contains("jwt"));

        token.set(None);
        assert!(clone.get().is_none());
    }
}
