//! Invite gate for account sign-up.
//!
//! A code must exist and be unused before an account is created. After the
//! account exists the code is marked used by the new uid with a conditional
//! update, so two sign-ups racing on one code cannot both redeem it.

mod supabase;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::RemoteError;

pub use supabase::SupabaseInviteGate;

/// Alphabet for generated codes; omits the confusable `I`, `O`, `0`, `1`
pub const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const INVITE_CODE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteCode {
    pub code: String,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub used_by: Option<String>,
    #[serde(default = "default_max_uses")]
    pub max_uses: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub used_at: Option<DateTime<Utc>>,
}

const fn default_max_uses() -> u32 {
    1
}

impl InviteCode {
    /// A fresh single-use code
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            used: false,
            used_by: None,
            max_uses: default_max_uses(),
            created_at: Utc::now(),
            used_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InviteError {
    #[error("An invite code is required to sign up")]
    Missing,
    #[error("Invite code is invalid")]
    Invalid,
    #[error("Invite code has already been used")]
    AlreadyUsed,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub type InviteResult<T> = Result<T, InviteError>;

#[async_trait]
pub trait InviteGate: Send + Sync {
    /// Verify that `code` exists and is unused
    async fn check(&self, code: &str) -> InviteResult<InviteCode>;

    /// Mark `code` as used by `uid`; fails with `AlreadyUsed` when another
    /// redemption got there first
    async fn redeem(&self, code: &str, uid: &str) -> InviteResult<()>;

    /// Store newly generated codes
    async fn issue(&self, codes: &[InviteCode]) -> InviteResult<()>;
}

pub type SharedInviteGate = Arc<dyn InviteGate>;

/// Trim a user-entered code, rejecting blanks
pub fn normalize_code(code: &str) -> InviteResult<&str> {
    let code = code.trim();
    if code.is_empty() {
        Err(InviteError::Missing)
    } else {
        Ok(code)
    }
}

/// Generate `count` random single-use codes
pub fn generate_invite_codes<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<InviteCode> {
    (0..count)
        .map(|_| {
            let code: String = (0..INVITE_CODE_LEN)
                .map(|_| char::from(INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())]))
                .collect();
            InviteCode::new(code)
        })
        .collect()
}

/// In-process invite gate keyed by code
#[derive(Debug, Default)]
pub struct MemoryInviteGate {
    codes: Mutex<BTreeMap<String, InviteCode>>,
}

impl MemoryInviteGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate unused codes
    #[must_use]
    pub fn with_codes<'a>(self, codes: impl IntoIterator<Item = &'a str>) -> Self {
        if let Ok(mut stored) = self.codes.lock() {
            for code in codes {
                stored.insert(code.to_string(), InviteCode::new(code));
            }
        }
        self
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<InviteCode> {
        self.codes.lock().ok()?.get(code).cloned()
    }

    fn lock(&self) -> InviteResult<std::sync::MutexGuard<'_, BTreeMap<String, InviteCode>>> {
        self.codes
            .lock()
            .map_err(|error| RemoteError::Unavailable(error.to_string()).into())
    }
}

#[async_trait]
impl InviteGate for MemoryInviteGate {
    async fn check(&self, code: &str) -> InviteResult<InviteCode> {
        let code = normalize_code(code)?;
        let invite = self.lock()?.get(code).cloned().ok_or(InviteError::Invalid)?;
        if invite.used {
            return Err(InviteError::AlreadyUsed);
        }
        Ok(invite)
    }

    async fn redeem(&self, code: &str, uid: &str) -> InviteResult<()> {
        let code = normalize_code(code)?;
        let mut codes = self.lock()?;
        let invite = codes.get_mut(code).ok_or(InviteError::Invalid)?;
        if invite.used {
            return Err(InviteError::AlreadyUsed);
        }
        invite.used = true;
        invite.used_by = Some(uid.to_string());
        invite.used_at = Some(Utc::now());
        Ok(())
    }

    async fn issue(&self, codes: &[InviteCode]) -> InviteResult<()> {
        let mut stored = self.lock()?;
        for invite in codes {
            stored.insert(invite.code.clone(), invite.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn generated_codes_use_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(42);
        let codes = generate_invite_codes(20, &mut rng);
        assert_eq!(codes.len(), 20);
        for invite in &codes {
            assert_eq!(invite.code.len(), INVITE_CODE_LEN);
            assert!(invite.code.bytes().all(|byte| INVITE_ALPHABET.contains(&byte)));
            assert!(!invite.used);
            assert_eq!(invite.max_uses, 1);
        }
    }

    #[test]
    fn blank_code_is_missing() {
        assert_eq!(normalize_code("  "), Err(InviteError::Missing));
        assert_eq!(normalize_code(" ABCD2345 "), Ok("ABCD2345"));
    }

    #[tokio::test]
    async fn unknown_code_is_invalid() {
        let gate = MemoryInviteGate::new();
        assert_eq!(gate.check("NOPE").await.unwrap_err(), InviteError::Invalid);
    }

    #[tokio::test]
    async fn code_can_be_redeemed_once() {
        let gate = MemoryInviteGate::new().with_codes(["WELCOME2"]);
        assert!(gate.check("WELCOME2").await.is_ok());

        gate.redeem("WELCOME2", "user-1").await.unwrap();
        let stored = gate.get("WELCOME2").unwrap();
        assert!(stored.used);
        assert_eq!(stored.used_by.as_deref(), Some("user-1"));
        assert!(stored.used_at.is_some());

        assert_eq!(gate.check("WELCOME2").await.unwrap_err(), InviteError::AlreadyUsed);
        assert_eq!(
            gate.redeem("WELCOME2", "user-2").await.unwrap_err(),
            InviteError::AlreadyUsed
        );
    }

    #[tokio::test]
    async fn issued_codes_become_checkable() {
        let gate = MemoryInviteGate::new();
        let mut rng = StdRng::seed_from_u64(1);
        let codes = generate_invite_codes(3, &mut rng);
        gate.issue(&codes).await.unwrap();
        for invite in &codes {
            assert!(gate.check(&invite.code).await.is_ok());
        }
    }
}
