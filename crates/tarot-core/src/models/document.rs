//! Per-user document model shared by the local and remote stores

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CardId, SpreadRecord};

/// Favorited card ids; order-irrelevant, serialized as a JSON array
pub type FavoriteSet = BTreeSet<CardId>;

/// One free-text note per card; serialized as a JSON object with string keys
pub type NoteMap = BTreeMap<CardId, String>;

/// The remote per-user document.
///
/// Every field is optional on read: a document written by an older client may
/// lack any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    #[serde(default)]
    pub favorites: FavoriteSet,
    #[serde(default)]
    pub notes: NoteMap,
    #[serde(default)]
    pub spreads: Vec<SpreadRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl UserDocument {
    /// A fresh document holding the given collections, stamped now
    #[must_use]
    pub fn seeded(favorites: FavoriteSet, notes: NoteMap, spreads: Vec<SpreadRecord>) -> Self {
        let now = Utc::now();
        Self {
            favorites,
            notes,
            spreads,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Top-level fields to replace in a user document.
///
/// Present fields replace the stored value entirely; absent fields are left
/// untouched. There is no finer-grained delta.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorites: Option<FavoriteSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<NoteMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreads: Option<Vec<SpreadRecord>>,
}

impl DocumentPatch {
    #[must_use]
    pub fn favorites(favorites: FavoriteSet) -> Self {
        Self {
            favorites: Some(favorites),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn notes(notes: NoteMap) -> Self {
        Self {
            notes: Some(notes),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn spreads(spreads: Vec<SpreadRecord>) -> Self {
        Self {
            spreads: Some(spreads),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.favorites.is_none() && self.notes.is_none() && self.spreads.is_none()
    }

    /// Merge into an existing document, bumping `updated_at`
    pub fn apply_to(&self, document: &mut UserDocument, now: DateTime<Utc>) {
        if let Some(favorites) = &self.favorites {
            document.favorites.clone_from(favorites);
        }
        if let Some(notes) = &self.notes {
            document.notes.clone_from(notes);
        }
        if let Some(spreads) = &self.spreads {
            document.spreads.clone_from(spreads);
        }
        document.updated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn notes_serialize_with_string_keys() {
        let mut notes = NoteMap::new();
        notes.insert(3, "tower energy".to_string());
        assert_eq!(
            serde_json::to_string(&notes).unwrap(),
            r#"{"3":"tower energy"}"#
        );
        let parsed: NoteMap = serde_json::from_str(r#"{"12":"hanged"}"#).unwrap();
        assert_eq!(parsed.get(&12).map(String::as_str), Some("hanged"));
    }

    #[test]
    fn document_tolerates_missing_fields() {
        let document: UserDocument = serde_json::from_str(r#"{"favorites":[1,2]}"#).unwrap();
        assert_eq!(document.favorites, FavoriteSet::from([1, 2]));
        assert!(document.notes.is_empty());
        assert!(document.spreads.is_empty());
        assert!(document.created_at.is_none());
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = DocumentPatch::favorites(FavoriteSet::from([5]));
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"favorites":[5]}"#);
        assert!(DocumentPatch::default().is_empty());
    }

    #[test]
    fn patch_replaces_whole_fields() {
        let mut document = UserDocument {
            favorites: FavoriteSet::from([1, 2, 3]),
            notes: NoteMap::from([(1, "keep".to_string())]),
            ..UserDocument::default()
        };
        let now = Utc::now();
        DocumentPatch::favorites(FavoriteSet::from([9])).apply_to(&mut document, now);

        assert_eq!(document.favorites, FavoriteSet::from([9]));
        assert_eq!(document.notes.get(&1).map(String::as_str), Some("keep"));
        assert_eq!(document.updated_at, Some(now));
    }
}
