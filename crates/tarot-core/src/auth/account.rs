use std::sync::{Arc, Mutex};

use super::{AuthProvider, AuthResult, AuthSession, SignUpOutcome};
use crate::invite::SharedInviteGate;
use crate::models::Identity;
use crate::remote::AccessToken;
use crate::session::SessionMonitor;

/// Account flows that drive the session monitor.
///
/// Every successful sign-in publishes the new identity; sign-out and a failed
/// restore publish `SignedOut`. The shared [`AccessToken`] is kept in step so
/// remote clients always act as the published identity.
pub struct AccountService {
    provider: Arc<dyn AuthProvider>,
    invites: SharedInviteGate,
    monitor: SessionMonitor,
    access_token: Option<AccessToken>,
    session: Mutex<Option<AuthSession>>,
}

impl AccountService {
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        invites: SharedInviteGate,
        monitor: SessionMonitor,
    ) -> Self {
        Self {
            provider,
            invites,
            monitor,
            access_token: None,
            session: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn with_access_token(mut self, token: AccessToken) -> Self {
        self.access_token = Some(token);
        self
    }

    /// Resolve the initial identity from a persisted session
    pub async fn restore(&self) -> Identity {
        match self.provider.restore_session().await {
            Ok(Some(session)) => self.adopt(session),
            Ok(None) => self.clear(),
            Err(error) => {
                tracing::warn!("Failed to restore session: {}", error);
                self.clear()
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        let session = self.provider.sign_in(email, password).await?;
        self.adopt(session.clone());
        Ok(session)
    }

    /// Create an account gated by an invite code.
    ///
    /// The code is checked before the account exists. Redemption happens
    /// after creation; if it fails the account is kept and the failure logged.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        invite_code: &str,
    ) -> AuthResult<SignUpOutcome> {
        let invite = self.invites.check(invite_code).await?;
        let outcome = self.provider.sign_up(email, password).await?;

        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.adopt(session.clone());
        }

        let uid = &outcome.user().id;
        if let Err(error) = self.invites.redeem(&invite.code, uid).await {
            tracing::warn!(
                "Account {} created but invite code {} was not redeemed: {}",
                uid,
                invite.code,
                error
            );
        }
        Ok(outcome)
    }

    /// End the session. Local state is signed out even if the provider call
    /// fails; that failure is still returned.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let session = self.session.lock().ok().and_then(|mut current| current.take());
        let result = match &session {
            Some(session) => self.provider.sign_out(session).await,
            None => Ok(()),
        };
        self.clear();
        result
    }

    #[must_use]
    pub fn current_session(&self) -> Option<AuthSession> {
        self.session.lock().ok().and_then(|current| current.clone())
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        self.monitor.current().unwrap_or_default()
    }

    fn adopt(&self, session: AuthSession) -> Identity {
        let identity = Identity::signed_in(session.user.id.clone());
        if let Some(token) = &self.access_token {
            token.set(Some(session.access_token.clone()));
        }
        if let Ok(mut current) = self.session.lock() {
            *current = Some(session);
        }
        self.monitor.publish(identity.clone());
        identity
    }

    fn clear(&self) -> Identity {
        if let Some(token) = &self.access_token {
            token.set(None);
        }
        if let Ok(mut current) = self.session.lock() {
            *current = None;
        }
        self.monitor.publish(Identity::SignedOut);
        Identity::SignedOut
    }
}
