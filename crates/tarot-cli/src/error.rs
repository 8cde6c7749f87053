use std::io;

use tarot_core::auth::AuthError;
use tarot_core::invite::InviteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] tarot_core::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Invite(#[from] InviteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No card with id {0}")]
    CardNotFound(u32),
    #[error("Spread not found for id/prefix: {0}")]
    SpreadNotFound(String),
    #[error("{0}")]
    AmbiguousSpreadId(String),
    #[error("Invalid card position '{0}': expected ID[r][:MEANING] or ?")]
    InvalidCardPosition(String),
    #[error("A spread needs at least one card")]
    EmptySpread,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Not signed in. Run `tarot auth login` first.")]
    NotSignedIn,
    #[error(
        "No remote is configured. Run `tarot config init --supabase-url URL --supabase-anon-key KEY` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )]
    RemoteNotConfigured,
}
