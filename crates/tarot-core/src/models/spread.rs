//! Spread (multi-card reading) model

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CardId;

/// Identifier of a spread record.
///
/// New ids are UUID v7 strings (time-sortable). Any other string is accepted
/// when reading existing records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpreadId(String);

impl SpreadId {
    /// Create a new time-based spread id
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SpreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpreadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SpreadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One card position inside a spread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadCard {
    /// Unique within the owning record
    pub id: String,
    /// Deck card at this position; `None` is an unassigned placeholder
    /// (stored as `-1`)
    #[serde(with = "placeholder_card_id")]
    pub card_id: Option<CardId>,
    /// Whether the card was drawn reversed
    #[serde(default)]
    pub is_reversed: bool,
    /// Free-text meaning of the position (e.g. "obstacle")
    #[serde(default)]
    pub position_meaning: String,
}

impl SpreadCard {
    /// A position with an assigned card
    pub fn new(card_id: CardId, is_reversed: bool, position_meaning: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().simple().to_string(),
            card_id: Some(card_id),
            is_reversed,
            position_meaning: position_meaning.into(),
        }
    }

    /// An empty position waiting for a card to be chosen
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            id: Uuid::now_v7().simple().to_string(),
            card_id: None,
            is_reversed: false,
            position_meaning: String::new(),
        }
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.card_id.is_none()
    }
}

/// A recorded multi-card reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpreadRecord {
    /// Stable across edits
    pub id: SpreadId,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub interpretation: String,
    #[serde(default)]
    pub summary: String,
    /// Calendar date of the reading
    #[serde(with = "reading_date")]
    pub date: NaiveDate,
    /// Ordered card positions
    #[serde(default)]
    pub cards: Vec<SpreadCard>,
    /// Set on first save, never changed afterwards
    pub created_at: DateTime<Utc>,
    /// Refreshed on every save
    pub updated_at: DateTime<Utc>,
}

impl SpreadRecord {
    /// Start a new, unsaved record for the given reading date
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: SpreadId::new(),
            question: String::new(),
            client_name: String::new(),
            interpretation: String::new(),
            summary: String::new(),
            date,
            cards: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Drop unassigned placeholder positions
    pub fn strip_placeholders(&mut self) {
        self.cards.retain(|card| !card.is_placeholder());
    }

    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        self.cards.iter().any(SpreadCard::is_placeholder)
    }
}

/// Sort newest-updated first. Stable for equal timestamps.
pub(crate) fn sort_by_updated_desc(spreads: &mut [SpreadRecord]) {
    spreads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

mod placeholder_card_id {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::models::CardId;

    const PLACEHOLDER: i64 = -1;

    pub fn serialize<S: Serializer>(value: &Option<CardId>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(id) => serializer.serialize_i64(i64::from(*id)),
            None => serializer.serialize_i64(PLACEHOLDER),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<CardId>, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        if raw < 0 {
            return Ok(None);
        }
        CardId::try_from(raw)
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("card id {raw} out of range")))
    }
}

mod reading_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    /// Accepts plain dates and full ISO timestamps (date part is kept).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let date_part = raw.trim().get(..10).unwrap_or(raw.trim());
        NaiveDate::parse_from_str(date_part, FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn spread_ids_are_unique() {
        assert_ne!(SpreadId::new(), SpreadId::new());
    }

    #[test]
    fn placeholder_card_serializes_as_minus_one() {
        let card = SpreadCard::placeholder();
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(value["cardId"], -1);
        assert_eq!(value["isReversed"], false);
    }

    #[test]
    fn negative_card_id_deserializes_as_placeholder() {
        let card: SpreadCard =
            serde_json::from_str(r#"{"id":"1","cardId":-1,"isReversed":false,"positionMeaning":""}"#)
                .unwrap();
        assert!(card.is_placeholder());

        let card: SpreadCard =
            serde_json::from_str(r#"{"id":"2","cardId":7,"isReversed":true,"positionMeaning":"past"}"#)
                .unwrap();
        assert_eq!(card.card_id, Some(7));
        assert!(card.is_reversed);
    }

    #[test]
    fn reading_date_accepts_iso_timestamp() {
        let raw = r#"{
            "id": "2024-03-01T10:00:00.000Z",
            "question": "career?",
            "date": "2024-03-01T00:00:00.000Z",
            "cards": [],
            "createdAt": "2024-03-01T10:00:00Z",
            "updatedAt": "2024-03-01T10:00:00Z"
        }"#;
        let record: SpreadRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.date, date(2024, 3, 1));
        assert_eq!(record.client_name, "");

        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["date"], "2024-03-01");
        assert_eq!(value["clientName"], "");
    }

    #[test]
    fn strip_placeholders_keeps_order_of_assigned_cards() {
        let mut record = SpreadRecord::new(date(2024, 1, 1));
        record.cards = vec![
            SpreadCard::new(3, false, "past"),
            SpreadCard::placeholder(),
            SpreadCard::new(9, true, "future"),
        ];
        assert!(record.has_placeholders());

        record.strip_placeholders();
        let ids: Vec<_> = record.cards.iter().map(|card| card.card_id).collect();
        assert_eq!(ids, vec![Some(3), Some(9)]);
        assert!(!record.has_placeholders());
    }
}
