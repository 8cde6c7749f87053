//! Static tarot card model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of a card in the static deck
pub type CardId = u32;

/// Suit grouping of a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardCategory {
    /// Major arcana
    Major,
    /// Wands
    Wands,
    /// Cups
    Cups,
    /// Swords
    Swords,
    /// Pentacles
    Pentacles,
}

impl CardCategory {
    /// All categories in display order
    pub const ALL: [Self; 5] = [
        Self::Major,
        Self::Wands,
        Self::Cups,
        Self::Swords,
        Self::Pentacles,
    ];

    /// Display label shown in the card grid
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Major => "大阿卡纳",
            Self::Wands => "权杖",
            Self::Cups => "圣杯",
            Self::Swords => "宝剑",
            Self::Pentacles => "星币",
        }
    }

    /// Stable lowercase key, as used in JSON and on the command line
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Wands => "wands",
            Self::Cups => "cups",
            Self::Swords => "swords",
            Self::Pentacles => "pentacles",
        }
    }
}

impl fmt::Display for CardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CardCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|category| {
                category.key().eq_ignore_ascii_case(needle) || category.label() == needle
            })
            .ok_or_else(|| format!("unknown card category '{needle}'"))
    }
}

/// Reading area of an interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    Love,
    Career,
    Wealth,
    Growth,
}

impl Aspect {
    pub const ALL: [Self; 4] = [Self::Love, Self::Career, Self::Wealth, Self::Growth];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Love => "love",
            Self::Career => "career",
            Self::Wealth => "wealth",
            Self::Growth => "growth",
        }
    }
}

impl FromStr for Aspect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|aspect| aspect.key().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("unknown aspect '{needle}'"))
    }
}

/// Interpretation text, one list of paragraphs per aspect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpretation {
    #[serde(default)]
    pub love: Vec<String>,
    #[serde(default)]
    pub career: Vec<String>,
    #[serde(default)]
    pub wealth: Vec<String>,
    #[serde(default)]
    pub growth: Vec<String>,
}

impl Interpretation {
    /// Paragraphs for a single aspect
    #[must_use]
    pub fn for_aspect(&self, aspect: Aspect) -> &[String] {
        match aspect {
            Aspect::Love => &self.love,
            Aspect::Career => &self.career,
            Aspect::Wealth => &self.wealth,
            Aspect::Growth => &self.growth,
        }
    }
}

/// A card definition from the static deck
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TarotCard {
    /// Unique identifier within the deck
    pub id: CardId,
    /// Display name
    pub name: String,
    /// English name
    pub name_en: String,
    /// Suit grouping
    pub category: CardCategory,
    /// One-line summary
    #[serde(default)]
    pub summary: String,
    /// Interpretation paragraphs per aspect
    #[serde(default)]
    pub interpretations: Interpretation,
    /// Image path or URL
    #[serde(default)]
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parses_key_and_label() {
        assert_eq!("cups".parse::<CardCategory>(), Ok(CardCategory::Cups));
        assert_eq!("MAJOR".parse::<CardCategory>(), Ok(CardCategory::Major));
        assert_eq!("星币".parse::<CardCategory>(), Ok(CardCategory::Pentacles));
        assert!("coins".parse::<CardCategory>().is_err());
    }

    #[test]
    fn card_deserializes_camel_case_fields() {
        let card: TarotCard = serde_json::from_str(
            r#"{"id":7,"name":"战车","nameEn":"The Chariot","category":"major",
                "interpretations":{"love":["steady"]}}"#,
        )
        .unwrap();
        assert_eq!(card.name_en, "The Chariot");
        assert_eq!(card.interpretations.for_aspect(Aspect::Love), ["steady"]);
        assert!(card.interpretations.for_aspect(Aspect::Career).is_empty());
    }
}
