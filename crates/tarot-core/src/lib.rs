//! tarot-core - Core library for Mystic Tarot Index
//!
//! Deck data, search, the local and remote stores, account flows and the sync
//! engine that keeps favorites, notes and spreads in step across them. Used by
//! the CLI and any other view layer.

pub mod auth;
pub mod config;
pub mod db;
pub mod deck;
pub mod error;
pub mod invite;
pub mod local;
pub mod models;
pub mod remote;
pub mod search;
pub mod session;
pub mod sync;
pub mod util;

pub use config::{ClientConfig, SupabaseProject};
pub use deck::{Deck, DrawnCard};
pub use error::{Error, Result};
pub use models::{
    Aspect, CardCategory, CardId, DocumentPatch, FavoriteSet, Identity, NoteMap, SpreadCard,
    SpreadId, SpreadRecord, TarotCard, UserDocument,
};
pub use sync::{SyncEngine, SyncPhase, SyncState};
