use tarot_core::search::{has_any_notes, notes_by_category, truncate_note, NOTE_PREVIEW_CHARS};
use tarot_core::CardId;

use crate::app::App;
use crate::commands::common::{card_label, read_piped_stdin, require_card};
use crate::error::CliError;

pub fn run_favorite(app: &App, id: CardId) -> Result<(), CliError> {
    let card = require_card(&app.deck, id)?;
    if app.engine.toggle_favorite(id) {
        println!("Added {} to favorites", card_label(card, false));
    } else {
        println!("Removed {} from favorites", card_label(card, false));
    }
    Ok(())
}

/// Text to store for `tarot note`, or `None` to print the current note
pub fn resolve_note_text(
    text_parts: &[String],
    clear: bool,
    piped: impl FnOnce() -> Result<Option<String>, CliError>,
) -> Result<Option<String>, CliError> {
    if clear {
        return Ok(Some(String::new()));
    }
    let joined = text_parts.join(" ");
    if !joined.trim().is_empty() {
        return Ok(Some(joined.trim().to_string()));
    }
    piped()
}

pub fn run_note(app: &App, id: CardId, text_parts: &[String], clear: bool) -> Result<(), CliError> {
    let card = require_card(&app.deck, id)?;
    let label = card_label(card, false);

    let Some(text) = resolve_note_text(text_parts, clear, read_piped_stdin)? else {
        match app.engine.note(id) {
            Some(note) => println!("{note}"),
            None => println!("No note for {label}"),
        }
        return Ok(());
    };

    let changed = app.engine.set_note(id, &text);
    match (changed, text.is_empty()) {
        (false, _) => println!("Note for {label} unchanged"),
        (true, true) => println!("Removed note for {label}"),
        (true, false) => println!("Saved note for {label}"),
    }
    Ok(())
}

pub fn format_note_groups(app: &App, full: bool) -> Vec<String> {
    let notes = app.engine.notes();
    let mut lines = Vec::new();
    for (category, cards) in notes_by_category(&app.deck, &notes) {
        lines.push(format!("{} ({})", category.label(), cards.len()));
        for (card, note) in cards {
            let body = if full {
                note.to_string()
            } else {
                truncate_note(note, NOTE_PREVIEW_CHARS)
            };
            lines.push(format!("  {:>2}  {}", card.id, card_label(card, false)));
            for line in body.lines() {
                lines.push(format!("      {line}"));
            }
        }
    }
    lines
}

pub fn run_notes(app: &App, full: bool) {
    if !has_any_notes(&app.engine.notes()) {
        println!("No notes yet. Add one with `tarot note <id> <text>`.");
        return;
    }
    for line in format_note_groups(app, full) {
        println!("{line}");
    }
}
