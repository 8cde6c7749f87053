use serde::Serialize;
use tarot_core::search::{filter_cards, CardFilter};
use tarot_core::{Aspect, CardId, SyncState, TarotCard};

use crate::app::App;
use crate::commands::common::{card_label, require_card};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct CardListItem<'a> {
    pub id: CardId,
    pub name: &'a str,
    pub name_en: &'a str,
    pub category: &'static str,
    pub favorite: bool,
    pub has_note: bool,
}

#[derive(Debug, Serialize)]
pub struct CardDetail<'a> {
    #[serde(flatten)]
    pub card: &'a TarotCard,
    pub favorite: bool,
    pub note: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct DrawItem<'a> {
    #[serde(flatten)]
    pub card: &'a TarotCard,
    pub is_reversed: bool,
}

pub fn card_list_item<'a>(card: &'a TarotCard, state: &SyncState) -> CardListItem<'a> {
    CardListItem {
        id: card.id,
        name: &card.name,
        name_en: &card.name_en,
        category: card.category.key(),
        favorite: state.is_favorite(card.id),
        has_note: state.note(card.id).is_some(),
    }
}

pub fn format_card_line(card: &TarotCard, state: &SyncState) -> String {
    let marker = if state.is_favorite(card.id) { "*" } else { " " };
    let note = if state.note(card.id).is_some() { "  [note]" } else { "" };
    format!(
        "{marker} {:>2}  {:<8}  {}{note}",
        card.id,
        card.category.label(),
        card_label(card, false)
    )
}

pub fn run_cards(app: &App, search: &str, filter: CardFilter, as_json: bool) -> Result<(), CliError> {
    let state = app.engine.snapshot();
    let cards = filter_cards(&app.deck, search, filter, &state.favorites);

    if as_json {
        let items = cards
            .iter()
            .map(|card| card_list_item(card, &state))
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if cards.is_empty() {
        println!("No cards match.");
    } else {
        for card in cards {
            println!("{}", format_card_line(card, &state));
        }
    }
    Ok(())
}

pub fn run_show(app: &App, id: CardId, aspect: Option<Aspect>, as_json: bool) -> Result<(), CliError> {
    let card = require_card(&app.deck, id)?;
    let state = app.engine.snapshot();

    if as_json {
        let detail = CardDetail {
            card,
            favorite: state.is_favorite(id),
            note: state.note(id),
        };
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    let marker = if state.is_favorite(id) { "  *" } else { "" };
    println!("{}  {}{marker}", card.id, card_label(card, false));
    println!("{}", card.category.label());
    if !card.summary.is_empty() {
        println!("\n{}", card.summary);
    }

    let aspects = aspect.map_or_else(|| Aspect::ALL.to_vec(), |aspect| vec![aspect]);
    for aspect in aspects {
        let paragraphs = card.interpretations.for_aspect(aspect);
        if paragraphs.is_empty() {
            continue;
        }
        println!("\n[{}]", aspect.key());
        for paragraph in paragraphs {
            println!("{paragraph}");
        }
    }

    if let Some(note) = state.note(id) {
        println!("\nNote: {note}");
    }
    Ok(())
}

pub fn run_draw(app: &App, as_json: bool) -> Result<(), CliError> {
    if app.deck.is_empty() {
        return Err(CliError::Config("The deck has no cards".into()));
    }
    let drawn = app.deck.draw(&mut rand::thread_rng());

    if as_json {
        let item = DrawItem {
            card: drawn.card,
            is_reversed: drawn.is_reversed,
        };
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("{}  {}", drawn.card.id, card_label(drawn.card, drawn.is_reversed));
        if !drawn.card.summary.is_empty() {
            println!("{}", drawn.card.summary);
        }
    }
    Ok(())
}
