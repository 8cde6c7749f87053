use chrono::{Local, Utc};
use serde::Serialize;
use tarot_core::{Deck, SpreadCard, SpreadRecord};

use crate::app::App;
use crate::cli::{SpreadArgs, SpreadCommands};
use crate::commands::common::{
    format_relative_time, format_timestamp, preview, require_card, resolve_spread, short_id,
    spread_card_label,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SpreadListItem<'a> {
    pub id: &'a str,
    pub date: String,
    pub question: &'a str,
    pub client_name: &'a str,
    pub cards: Vec<String>,
    pub updated_at: String,
    pub relative_time: String,
}

pub fn run_spread(app: &App, command: SpreadCommands) -> Result<(), CliError> {
    match command {
        SpreadCommands::List { json } => run_list(app, json),
        SpreadCommands::Show { id } => run_show(app, &id),
        SpreadCommands::Add(args) => run_add(app, args),
        SpreadCommands::Delete { id } => run_delete(app, &id),
    }
}

fn run_list(app: &App, as_json: bool) -> Result<(), CliError> {
    let spreads = app.engine.spreads();
    let now_ms = Utc::now().timestamp_millis();

    if as_json {
        let items = spreads
            .iter()
            .map(|spread| SpreadListItem {
                id: spread.id.as_str(),
                date: spread.date.to_string(),
                question: &spread.question,
                client_name: &spread.client_name,
                cards: spread
                    .cards
                    .iter()
                    .map(|position| spread_card_label(&app.deck, position))
                    .collect(),
                updated_at: spread.updated_at.to_rfc3339(),
                relative_time: format_relative_time(spread.updated_at.timestamp_millis(), now_ms),
            })
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if spreads.is_empty() {
        if app.engine.identity().is_signed_in() {
            println!("No spreads yet.");
        } else {
            println!("No spreads. Sign in to keep a spread journal.");
        }
        return Ok(());
    }

    for spread in &spreads {
        let question = if spread.question.trim().is_empty() {
            "(no question)".to_string()
        } else {
            preview(&spread.question, 40)
        };
        let relative_time = format_relative_time(spread.updated_at.timestamp_millis(), now_ms);
        println!(
            "{:<13}  {}  {question:<40}  {:>2} cards  {relative_time}",
            short_id(spread.id.as_str()),
            spread.date,
            spread.cards.len()
        );
    }
    Ok(())
}

fn run_show(app: &App, query: &str) -> Result<(), CliError> {
    let spreads = app.engine.spreads();
    let spread = resolve_spread(&spreads, query)?;
    for line in format_spread(&app.deck, spread) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_spread(deck: &Deck, spread: &SpreadRecord) -> Vec<String> {
    let mut lines = vec![format!("{}  {}", spread.id, spread.date)];
    if !spread.client_name.trim().is_empty() {
        lines.push(format!("Client: {}", spread.client_name.trim()));
    }
    if !spread.question.trim().is_empty() {
        lines.push(format!("Question: {}", spread.question.trim()));
    }
    for (index, position) in spread.cards.iter().enumerate() {
        lines.push(format!("  {}. {}", index + 1, spread_card_label(deck, position)));
    }
    if !spread.interpretation.trim().is_empty() {
        lines.push(String::new());
        lines.push(spread.interpretation.trim().to_string());
    }
    if !spread.summary.trim().is_empty() {
        lines.push(format!("Summary: {}", spread.summary.trim()));
    }
    lines.push(format!(
        "Created {}, updated {}",
        format_timestamp(spread.created_at),
        format_timestamp(spread.updated_at)
    ));
    lines
}

/// Parse `ID[r][:MEANING]`; an ID of `?` is an unassigned position
pub fn parse_card_position(raw: &str) -> Result<SpreadCard, CliError> {
    let (card, meaning) = raw.split_once(':').unwrap_or((raw, ""));
    let card = card.trim();
    let meaning = meaning.trim();

    if card == "?" {
        let mut position = SpreadCard::placeholder();
        position.position_meaning = meaning.to_string();
        return Ok(position);
    }

    let (digits, is_reversed) = match card.strip_suffix(|c: char| c == 'r' || c == 'R') {
        Some(digits) => (digits, true),
        None => (card, false),
    };
    let card_id = digits
        .parse()
        .map_err(|_| CliError::InvalidCardPosition(raw.to_string()))?;
    Ok(SpreadCard::new(card_id, is_reversed, meaning))
}

/// Build the record to save from CLI arguments, on top of `existing` when
/// updating
pub fn build_spread(
    deck: &Deck,
    args: SpreadArgs,
    existing: Option<SpreadRecord>,
) -> Result<SpreadRecord, CliError> {
    let is_new = existing.is_none();
    let mut record = existing.unwrap_or_else(|| {
        SpreadRecord::new(args.date.unwrap_or_else(|| Local::now().date_naive()))
    });

    if let Some(date) = args.date {
        record.date = date;
    }
    if let Some(question) = args.question {
        record.question = question;
    }
    if let Some(client) = args.client {
        record.client_name = client;
    }
    if let Some(interpretation) = args.interpretation {
        record.interpretation = interpretation;
    }
    if let Some(summary) = args.summary {
        record.summary = summary;
    }

    if !args.cards.is_empty() {
        let cards = args
            .cards
            .iter()
            .map(|raw| parse_card_position(raw))
            .collect::<Result<Vec<_>, _>>()?;
        for card_id in cards.iter().filter_map(|position| position.card_id) {
            require_card(deck, card_id)?;
        }
        record.cards = cards;
    }

    if is_new && record.cards.is_empty() {
        return Err(CliError::EmptySpread);
    }
    Ok(record)
}

fn run_add(app: &App, args: SpreadArgs) -> Result<(), CliError> {
    if !app.engine.identity().is_signed_in() {
        return Err(CliError::NotSignedIn);
    }

    let existing = match args.id.as_deref() {
        Some(query) => {
            let spreads = app.engine.spreads();
            Some(resolve_spread(&spreads, query)?.clone())
        }
        None => None,
    };
    let updating = existing.is_some();
    let record = build_spread(&app.deck, args, existing)?;
    let placeholders = record.cards.iter().filter(|card| card.is_placeholder()).count();

    let saved = app.engine.save_spread(record);
    if placeholders > 0 {
        println!("Skipped {placeholders} unassigned position(s)");
    }
    let verb = if updating { "Updated" } else { "Saved" };
    println!("{verb} spread {} ({} cards)", saved.id, saved.cards.len());
    Ok(())
}

fn run_delete(app: &App, query: &str) -> Result<(), CliError> {
    if !app.engine.identity().is_signed_in() {
        return Err(CliError::NotSignedIn);
    }

    let spreads = app.engine.spreads();
    let spread = resolve_spread(&spreads, query)?;
    if app.engine.delete_spread(&spread.id) {
        println!("Deleted spread {}", spread.id);
    }
    Ok(())
}
