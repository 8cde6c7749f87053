//! Static tarot deck
//!
//! Loaded once at startup and never mutated. The bundled deck holds the 78
//! cards with ids `0..=77`; a replacement deck can be loaded from a JSON file
//! with the same shape.

use std::collections::HashSet;
use std::path::Path;

use rand::Rng;

use crate::error::{Error, Result};
use crate::models::{CardId, TarotCard};

const BUNDLED_DECK: &str = include_str!("../data/deck.json");

/// An ordered, immutable sequence of card definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<TarotCard>,
}

/// Result of drawing a single card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawnCard<'a> {
    pub card: &'a TarotCard,
    pub is_reversed: bool,
}

impl Deck {
    /// The deck shipped with the application
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_DECK)
    }

    /// Load a deck from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parse a deck from a JSON array of cards
    pub fn from_json(raw: &str) -> Result<Self> {
        let cards: Vec<TarotCard> = serde_json::from_str(raw)?;
        Self::from_cards(cards)
    }

    /// Build a deck, rejecting duplicate ids
    pub fn from_cards(cards: Vec<TarotCard>) -> Result<Self> {
        if cards.is_empty() {
            return Err(Error::Deck("deck must contain at least one card".to_string()));
        }

        let mut seen = HashSet::with_capacity(cards.len());
        if let Some(duplicate) = cards.iter().find(|card| !seen.insert(card.id)) {
            return Err(Error::Deck(format!("duplicate card id {}", duplicate.id)));
        }

        Ok(Self { cards })
    }

    #[must_use]
    pub fn cards(&self) -> &[TarotCard] {
        &self.cards
    }

    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&TarotCard> {
        self.cards.iter().find(|card| card.id == id)
    }

    /// Look up a card, failing with `NotFound` for unknown ids
    pub fn require(&self, id: CardId) -> Result<&TarotCard> {
        self.get(id)
            .ok_or_else(|| Error::NotFound(format!("card {id}")))
    }

    #[must_use]
    pub fn contains(&self, id: CardId) -> bool {
        self.get(id).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Draw one card uniformly at random, reversed half of the time
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> DrawnCard<'_> {
        let index = rng.gen_range(0..self.cards.len());
        DrawnCard {
            card: &self.cards[index],
            is_reversed: rng.gen_bool(0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::models::CardCategory;

    #[test]
    fn bundled_deck_has_full_set() {
        let deck = Deck::bundled().unwrap();
        assert_eq!(deck.len(), 78);

        let majors = deck
            .cards()
            .iter()
            .filter(|card| card.category == CardCategory::Major)
            .count();
        assert_eq!(majors, 22);
        assert_eq!(deck.get(0).map(|card| card.name_en.as_str()), Some("The Fool"));
        assert!(deck.contains(77));
        assert!(!deck.contains(78));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let raw = r#"[
            {"id":1,"name":"a","nameEn":"A","category":"cups"},
            {"id":1,"name":"b","nameEn":"B","category":"cups"}
        ]"#;
        let error = Deck::from_json(raw).unwrap_err();
        assert!(error.to_string().contains("duplicate card id 1"));
    }

    #[test]
    fn empty_deck_is_rejected() {
        assert!(Deck::from_json("[]").is_err());
    }

    #[test]
    fn require_reports_unknown_card() {
        let deck = Deck::bundled().unwrap();
        assert!(deck.require(5).is_ok());
        assert!(matches!(deck.require(500), Err(Error::NotFound(_))));
    }

    #[test]
    fn draw_returns_card_from_deck() {
        let deck = Deck::bundled().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut reversed = 0;
        for _ in 0..200 {
            let drawn = deck.draw(&mut rng);
            assert!(deck.contains(drawn.card.id));
            if drawn.is_reversed {
                reversed += 1;
            }
        }
        assert!(reversed > 0 && reversed < 200);
    }
}
