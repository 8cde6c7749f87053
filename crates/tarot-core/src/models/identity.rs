//! Authenticated identity model

use std::fmt;

use serde::{Deserialize, Serialize};

/// The user handle driving which remote document is read and written.
///
/// Produced by the auth provider on sign-in and dropped on sign-out. The sync
/// engine never persists it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Identity {
    /// No active session
    #[default]
    SignedOut,
    /// Active session for the given user id
    SignedIn {
        /// Opaque user identifier issued by the auth provider
        uid: String,
    },
}

impl Identity {
    /// Create a signed-in identity
    pub fn signed_in(uid: impl Into<String>) -> Self {
        Self::SignedIn { uid: uid.into() }
    }

    /// The user id, when signed in
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        match self {
            Self::SignedOut => None,
            Self::SignedIn { uid } => Some(uid),
        }
    }

    /// Whether a session is active
    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        matches!(self, Self::SignedIn { .. })
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SignedOut => write!(f, "signed out"),
            Self::SignedIn { uid } => write!(f, "signed in as {uid}"),
        }
    }
}
