use std::fmt;

use crate::models::{CardId, FavoriteSet, Identity, NoteMap, SpreadId, SpreadRecord};

/// Engine lifecycle. `Loading` is re-entered on every identity transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Loading => f.write_str("loading"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

/// The aggregate owned by the sync engine and observed by the view layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub identity: Identity,
    pub phase: SyncPhase,
    pub favorites: FavoriteSet,
    pub notes: NoteMap,
    /// Newest-updated first
    pub spreads: Vec<SpreadRecord>,
    generation: u64,
    /// Identity the collections were last loaded for
    pub(super) owner: Identity,
}

impl SyncState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == SyncPhase::Loading
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.phase == SyncPhase::Ready
    }

    #[must_use]
    pub fn is_favorite(&self, card_id: CardId) -> bool {
        self.favorites.contains(&card_id)
    }

    #[must_use]
    pub fn note(&self, card_id: CardId) -> Option<&str> {
        self.notes.get(&card_id).map(String::as_str)
    }

    #[must_use]
    pub fn spread(&self, id: &SpreadId) -> Option<&SpreadRecord> {
        self.spreads.iter().find(|spread| &spread.id == id)
    }

    /// Number of identity transitions begun so far
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// User whose remote document may be written right now.
    ///
    /// Only a `Ready` engine with a signed-in identity writes remotely; while
    /// `Loading` the remote document has not been adopted yet.
    pub(super) fn remote_target(&self) -> Option<String> {
        if self.phase != SyncPhase::Ready {
            return None;
        }
        self.identity.uid().map(str::to_string)
    }

    /// Whether the collections hold pre-login data that may seed a new
    /// remote document
    pub(super) fn holds_signed_out_data(&self) -> bool {
        !self.owner.is_signed_in()
    }

    pub(super) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }
}
