//! Error types for tarot-core

use thiserror::Error;

/// Result type alias using tarot-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tarot-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Card or spread not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Static deck could not be loaded
    #[error("Deck error: {0}")]
    Deck(String),
}
