//! Supabase auth client and the auth provider seam.

mod account;

use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::invite::InviteError;
use crate::remote::RemoteError;
use crate::util::{normalize_text_option, supabase_service_url, unix_timestamp_now};

pub use account::AccountService;

const EXPIRY_SKEW_SECONDS: i64 = 60;
pub const MIN_PASSWORD_CHARS: usize = 6;

static EMAIL_PATTERN: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: AuthUser,
}

impl AuthSession {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// Account created; the email address must be confirmed before sign-in
    ConfirmationRequired { user: AuthUser },
}

impl SignUpOutcome {
    #[must_use]
    pub const fn user(&self) -> &AuthUser {
        match self {
            Self::SignedIn(session) => &session.user,
            Self::ConfirmationRequired { user } => user,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Email or password is incorrect")]
    InvalidCredential,
    #[error("An account with this email already exists")]
    EmailInUse,
    #[error("Password must be at least {MIN_PASSWORD_CHARS} characters")]
    WeakPassword,
    #[error("No account exists for this email")]
    UserNotFound,
    #[error("Email address is not valid")]
    InvalidEmail,
    #[error("An invite code is required to sign up")]
    InviteRequired,
    #[error("Invite code is invalid")]
    InviteInvalid,
    #[error("Invite code has already been used")]
    InviteAlreadyUsed,
    #[error("Supabase auth is not configured for this build.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(&'static str),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Auth API error: {0}")]
    Api(String),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<InviteError> for AuthError {
    fn from(error: InviteError) -> Self {
        match error {
            InviteError::Missing => Self::InviteRequired,
            InviteError::Invalid => Self::InviteInvalid,
            InviteError::AlreadyUsed => Self::InviteAlreadyUsed,
            InviteError::Remote(error) => Self::Remote(error),
        }
    }
}

impl AuthError {
    /// Whether the error stems from user input and can be fixed by retrying
    #[must_use]
    pub const fn is_user_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredential
                | Self::EmailInUse
                | Self::WeakPassword
                | Self::UserNotFound
                | Self::InvalidEmail
                | Self::InviteRequired
                | Self::InviteInvalid
                | Self::InviteAlreadyUsed
        )
    }
}

pub type AuthResult<T> = Result<T, AuthError>;

pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<AuthSession>>;
    fn save_session(&self, session: &AuthSession) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// External identity provider
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resume a persisted session, refreshing it when expired
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>>;

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome>;

    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()>;
}

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
        })
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Refresh response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<SupabaseAuthResponse> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status, &body));
        }
        Ok(response.json::<SupabaseAuthResponse>().await?)
    }
}

#[async_trait]
impl<S: SessionPersistence> AuthProvider for SupabaseAuthClient<S> {
    async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let Some(stored_session) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored_session.is_expired() {
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );

        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Sign-in response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email.trim(),
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/signup", self.auth_url))
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        let fallback_user = response.user_only();
        match response.into_session()? {
            Some(session) => {
                self.store.save_session(&session)?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => {
                let user = fallback_user.ok_or_else(|| {
                    AuthError::Api("Sign-up response did not include a user".to_string())
                })?;
                Ok(SignUpOutcome::ConfirmationRequired { user })
            }
        }
    }

    async fn sign_out(&self, session: &AuthSession) -> AuthResult<()> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token);

        let response = request.send().await?;
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_api_error(status, &body));
        }

        self.store.clear_session()?;
        Ok(())
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    supabase_service_url(url, "/auth/v1").map_err(AuthError::InvalidConfiguration)
}

/// Both values or neither; a half-configured remote is an error
pub fn resolve_optional_supabase_config(
    url: Option<String>,
    anon_key: Option<String>,
) -> AuthResult<Option<(String, String)>> {
    let url = normalize_text_option(url);
    let anon_key = normalize_text_option(anon_key);

    match (url, anon_key) {
        (None, None) => Ok(None),
        (Some(url), Some(anon_key)) => Ok(Some((url, anon_key))),
        _ => Err(AuthError::NotConfigured),
    }
}

/// Local checks run before any request reaches the provider
pub fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    let pattern = EMAIL_PATTERN
        .as_ref()
        .map_err(|_| AuthError::InvalidConfiguration("email pattern failed to compile"))?;
    if !pattern.is_match(email.trim()) {
        return Err(AuthError::InvalidEmail);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
    session: Option<SupabaseAuthResponseSession>,
    // Sign-up without confirmation returns the bare user object
    id: Option<String>,
    email: Option<String>,
}

impl SupabaseAuthResponse {
    fn user_only(&self) -> Option<AuthUser> {
        if let Some(user) = &self.user {
            return Some(AuthUser {
                id: user.id.clone(),
                email: user.email.clone(),
            });
        }
        self.id.as_ref().map(|id| AuthUser {
            id: id.clone(),
            email: self.email.clone(),
        })
    }

    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let nested_session = self.session;
        let access_token = self.access_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.access_token.clone())
        });
        let refresh_token = self.refresh_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.refresh_token.clone())
        });
        let expires_at = self
            .expires_at
            .or_else(|| nested_session.as_ref().and_then(|session| session.expires_at))
            .or_else(|| {
                self.expires_in
                    .or_else(|| nested_session.as_ref().and_then(|session| session.expires_in))
                    .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
            });
        let user = self
            .user
            .or_else(|| nested_session.and_then(|session| session.user))
            .map(Into::into);

        match (access_token, refresh_token, expires_at) {
            (Some(access_token), Some(refresh_token), Some(expires_at)) => {
                let user = user.ok_or_else(|| {
                    AuthError::Api("Auth response did not include the user".to_string())
                })?;
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, None) => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponseSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
}

impl From<SupabaseUser> for AuthUser {
    fn from(value: SupabaseUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseErrorResponse {
    error: Option<String>,
    error_code: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

/// Map a failed auth response onto the error taxonomy
fn classify_api_error(status: StatusCode, body: &str) -> AuthError {
    let payload = serde_json::from_str::<SupabaseErrorResponse>(body).ok();
    let code = payload
        .as_ref()
        .and_then(|payload| payload.error_code.clone().or_else(|| payload.error.clone()))
        .unwrap_or_default();
    let message = payload
        .and_then(|payload| {
            payload
                .message
                .or(payload.msg)
                .or(payload.error_description)
        })
        .unwrap_or_else(|| body.trim().to_string());
    let lowered = message.to_ascii_lowercase();

    match code.as_str() {
        "invalid_credentials" | "invalid_grant" if !lowered.contains("refresh") => {
            return AuthError::InvalidCredential;
        }
        "email_exists" | "user_already_exists" => return AuthError::EmailInUse,
        "weak_password" => return AuthError::WeakPassword,
        "user_not_found" => return AuthError::UserNotFound,
        "email_address_invalid" => return AuthError::InvalidEmail,
        _ => {}
    }

    if lowered.contains("invalid login credentials") {
        AuthError::InvalidCredential
    } else if lowered.contains("already registered") || lowered.contains("already exists") {
        AuthError::EmailInUse
    } else if lowered.contains("password should be") {
        AuthError::WeakPassword
    } else if lowered.contains("user not found") {
        AuthError::UserNotFound
    } else if message.is_empty() {
        AuthError::Api(format!("HTTP {}", status.as_u16()))
    } else {
        AuthError::Api(format!("{} ({})", message, status.as_u16()))
    }
}
