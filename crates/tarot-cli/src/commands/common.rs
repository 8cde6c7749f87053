use std::io::{self, IsTerminal, Read};

use chrono::{DateTime, Utc};
use tarot_core::{Deck, SpreadCard, SpreadRecord, TarotCard};

use crate::error::CliError;

const SHORT_ID_CHARS: usize = 13;

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

pub fn require_card(deck: &Deck, id: u32) -> Result<&TarotCard, CliError> {
    deck.get(id).ok_or(CliError::CardNotFound(id))
}

pub fn card_label(card: &TarotCard, is_reversed: bool) -> String {
    let orientation = if is_reversed { " (reversed)" } else { "" };
    format!("{} {}{orientation}", card.name, card.name_en)
}

pub fn spread_card_label(deck: &Deck, position: &SpreadCard) -> String {
    let card = position
        .card_id
        .and_then(|id| deck.get(id))
        .map_or_else(|| "?".to_string(), |card| card_label(card, position.is_reversed));
    if position.position_meaning.trim().is_empty() {
        card
    } else {
        format!("{card}: {}", position.position_meaning.trim())
    }
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_CHARS).collect()
}

/// Find a spread by full id or unique id prefix
pub fn resolve_spread<'a>(
    spreads: &'a [SpreadRecord],
    query: &str,
) -> Result<&'a SpreadRecord, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::SpreadNotFound(query.to_string()));
    }
    if let Some(exact) = spreads.iter().find(|spread| spread.id.as_str() == query) {
        return Ok(exact);
    }

    let matching = spreads
        .iter()
        .filter(|spread| spread.id.as_str().starts_with(query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::SpreadNotFound(query.to_string())),
        [spread] => Ok(spread),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|spread| short_id(spread.id.as_str()))
                .collect::<Vec<_>>()
                .join(", ");

            Err(CliError::AmbiguousSpreadId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

pub fn preview(text: &str, max_chars: usize) -> String {
    let first_line = text.lines().next().unwrap_or("").trim();
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
