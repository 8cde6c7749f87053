use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use serde_json::json;

use super::{normalize_code, InviteCode, InviteError, InviteGate, InviteResult};
use crate::remote::{AccessToken, Bearer, PostgrestClient};

const INVITES_TABLE: &str = "invite_codes";

/// Invite codes in the `invite_codes` table.
///
/// Codes are checked with the anon key (the user has no account yet) and
/// redeemed with whichever token is available right after sign-up.
#[derive(Clone)]
pub struct SupabaseInviteGate {
    postgrest: PostgrestClient,
}

impl SupabaseInviteGate {
    pub fn new(project_url: &str, anon_key: &str, token: AccessToken) -> InviteResult<Self> {
        Ok(Self {
            postgrest: PostgrestClient::new(project_url, anon_key, token)?,
        })
    }
}

#[async_trait]
impl InviteGate for SupabaseInviteGate {
    async fn check(&self, code: &str) -> InviteResult<InviteCode> {
        let code = normalize_code(code)?;
        let request = self
            .postgrest
            .request(Method::GET, INVITES_TABLE, Bearer::Anon)?
            .query(&[("code", format!("eq.{code}")), ("select", "*".to_string())]);
        let response = PostgrestClient::send(request).await?;
        let rows: Vec<InviteCode> = PostgrestClient::json(response).await?;

        let invite = rows.into_iter().next().ok_or(InviteError::Invalid)?;
        if invite.used {
            return Err(InviteError::AlreadyUsed);
        }
        Ok(invite)
    }

    async fn redeem(&self, code: &str, uid: &str) -> InviteResult<()> {
        let code = normalize_code(code)?;
        let request = self
            .postgrest
            .request(Method::PATCH, INVITES_TABLE, Bearer::UserOrAnon)?
            .query(&[("code", format!("eq.{code}")), ("used", "is.false".to_string())])
            .header("Prefer", "return=representation")
            .json(&json!({
                "used": true,
                "used_by": uid,
                "used_at": Utc::now(),
            }));
        let response = PostgrestClient::send(request).await?;
        let updated: Vec<InviteCode> = PostgrestClient::json(response).await?;

        if updated.is_empty() {
            return Err(InviteError::AlreadyUsed);
        }
        tracing::info!("Invite code {} redeemed by {}", code, uid);
        Ok(())
    }

    async fn issue(&self, codes: &[InviteCode]) -> InviteResult<()> {
        if codes.is_empty() {
            return Ok(());
        }
        let request = self
            .postgrest
            .request(Method::POST, INVITES_TABLE, Bearer::User)?
            .header("Prefer", "return=minimal")
            .json(codes);
        PostgrestClient::send(request).await?;
        tracing::info!("Issued {} invite codes", codes.len());
        Ok(())
    }
}
