//! `SQLite`-backed local key/value store and device-local documents

mod connection;
mod documents;
mod migrations;
mod repository;

pub use connection::Database;
pub use documents::{SqliteDocumentStore, LOCAL_PROFILE_UID};
pub use repository::SqliteLocalStore;
