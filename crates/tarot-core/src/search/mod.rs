//! Card search and derived note views
//!
//! Pure functions over the static deck and the user's favorites and notes.
//! Nothing here is cached; callers recompute on every input change.

use std::fmt;
use std::str::FromStr;

use crate::deck::Deck;
use crate::models::{CardCategory, FavoriteSet, NoteMap, TarotCard};

/// Default preview length for note excerpts
pub const NOTE_PREVIEW_CHARS: usize = 250;

/// Active grid filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CardFilter {
    #[default]
    All,
    Favorites,
    Category(CardCategory),
}

impl CardFilter {
    fn matches(self, card: &TarotCard, favorites: &FavoriteSet) -> bool {
        match self {
            Self::All => true,
            Self::Favorites => favorites.contains(&card.id),
            Self::Category(category) => card.category == category,
        }
    }
}

impl fmt::Display for CardFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Favorites => f.write_str("favorites"),
            Self::Category(category) => f.write_str(category.key()),
        }
    }
}

impl FromStr for CardFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "favorites" | "favourites" => Ok(Self::Favorites),
            other => other.parse().map(Self::Category),
        }
    }
}

/// Cards matching a name substring and the active filter, in deck order.
///
/// Matching is a case-sensitive substring test on the display name; an empty
/// search matches every card.
pub fn filter_cards<'a>(
    deck: &'a Deck,
    search: &str,
    filter: CardFilter,
    favorites: &FavoriteSet,
) -> Vec<&'a TarotCard> {
    deck.cards()
        .iter()
        .filter(|card| card.name.contains(search))
        .filter(|card| filter.matches(card, favorites))
        .collect()
}

/// Cards with a non-blank note, grouped by category in display order.
///
/// Categories without any noted card are omitted.
pub fn notes_by_category<'a>(
    deck: &'a Deck,
    notes: &'a NoteMap,
) -> Vec<(CardCategory, Vec<(&'a TarotCard, &'a str)>)> {
    CardCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let cards = deck
                .cards()
                .iter()
                .filter(|card| card.category == category)
                .filter_map(|card| {
                    notes
                        .get(&card.id)
                        .filter(|note| !note.trim().is_empty())
                        .map(|note| (card, note.as_str()))
                })
                .collect::<Vec<_>>();
            (!cards.is_empty()).then_some((category, cards))
        })
        .collect()
}

/// Whether any note has visible content
pub fn has_any_notes(notes: &NoteMap) -> bool {
    notes.values().any(|note| !note.trim().is_empty())
}

/// Shorten a note to `max_chars` characters, appending `...` when cut
pub fn truncate_note(note: &str, max_chars: usize) -> String {
    if note.chars().count() <= max_chars {
        return note.to_string();
    }
    let mut truncated = note.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}
