use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{CommandFactory, Parser};
use pretty_assertions::assert_eq;
use tarot_core::db::LOCAL_PROFILE_UID;
use tarot_core::search::CardFilter;
use tarot_core::{Aspect, CardCategory, ClientConfig, Deck, Identity, SpreadId, SpreadRecord};
use tempfile::tempdir;

use crate::app::App;
use crate::cli::{AppCommands, Cli, Commands, CompletionShell, SpreadArgs, SpreadCommands};
use crate::commands::common::{card_label, format_relative_time, preview, resolve_spread};
use crate::commands::completions::render_completions;
use crate::commands::config::{mask_key, merge_config_init, ConfigInit};
use crate::commands::journal::{format_note_groups, resolve_note_text, run_favorite, run_note};
use crate::commands::spread::{build_spread, format_spread, parse_card_position, run_spread};
use crate::error::CliError;
use crate::settings::Settings;

fn local_settings(dir: &Path) -> Settings {
    Settings {
        config_path: dir.join("config.json"),
        config: ClientConfig::default(),
        local_store_path: dir.join("tarot").join("local.db"),
    }
}

fn spread_with_id(id: &str) -> SpreadRecord {
    let mut record = SpreadRecord::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    record.id = SpreadId::from(id);
    record
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn parses_card_listing_flags() {
    let cli = Cli::try_parse_from(["tarot", "cards", "--filter", "favorites", "--json"]).unwrap();
    match cli.command {
        Commands::App(AppCommands::Cards {
            search,
            filter,
            json,
        }) => {
            assert_eq!(search, "");
            assert_eq!(filter, CardFilter::Favorites);
            assert!(json);
        }
        _ => panic!("expected cards command"),
    }

    let cli = Cli::try_parse_from(["tarot", "ls", "-f", "cups"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::App(AppCommands::Cards {
            filter: CardFilter::Category(CardCategory::Cups),
            ..
        })
    ));

    assert!(Cli::try_parse_from(["tarot", "cards", "--filter", "coins"]).is_err());
}

#[test]
fn parses_show_aspect_and_global_paths() {
    let cli = Cli::try_parse_from([
        "tarot",
        "show",
        "7",
        "--aspect",
        "career",
        "--local-store",
        "/tmp/tarot.db",
    ])
    .unwrap();

    assert_eq!(cli.local_store, Some(PathBuf::from("/tmp/tarot.db")));
    assert!(matches!(
        cli.command,
        Commands::App(AppCommands::Show {
            id: 7,
            aspect: Some(Aspect::Career),
            json: false,
        })
    ));
}

#[test]
fn note_clear_conflicts_with_text() {
    assert!(Cli::try_parse_from(["tarot", "note", "3", "hello", "--clear"]).is_err());
    assert!(Cli::try_parse_from(["tarot", "note", "3", "--clear"]).is_ok());
}

#[test]
fn parses_spread_add_positions() {
    let cli = Cli::try_parse_from([
        "tarot", "spread", "add", "-q", "Move?", "-c", "1", "-c", "13r:obstacle", "--date",
        "2024-05-06",
    ])
    .unwrap();

    let Commands::App(AppCommands::Spread {
        command: SpreadCommands::Add(args),
    }) = cli.command
    else {
        panic!("expected spread add");
    };
    assert_eq!(args.question.as_deref(), Some("Move?"));
    assert_eq!(args.cards, vec!["1".to_string(), "13r:obstacle".to_string()]);
    assert_eq!(args.date, NaiveDate::from_ymd_opt(2024, 5, 6));
}

#[test]
fn resolve_note_text_prefers_arguments_over_stdin() {
    let text = resolve_note_text(&["  a".to_string(), "quiet day ".to_string()], false, || {
        panic!("stdin must not be read when text is given")
    })
    .unwrap();
    assert_eq!(text.as_deref(), Some("a quiet day"));

    let cleared = resolve_note_text(&[], true, || Ok(Some("ignored".to_string()))).unwrap();
    assert_eq!(cleared.as_deref(), Some(""));

    let piped = resolve_note_text(&[], false, || Ok(Some("from pipe".to_string()))).unwrap();
    assert_eq!(piped.as_deref(), Some("from pipe"));

    let print = resolve_note_text(&[], false, || Ok(None)).unwrap();
    assert_eq!(print, None);
}

#[test]
fn parse_card_position_accepts_reversed_and_placeholders() {
    let upright = parse_card_position("5").unwrap();
    assert_eq!(upright.card_id, Some(5));
    assert!(!upright.is_reversed);
    assert_eq!(upright.position_meaning, "");

    let reversed = parse_card_position("13R: obstacle ").unwrap();
    assert_eq!(reversed.card_id, Some(13));
    assert!(reversed.is_reversed);
    assert_eq!(reversed.position_meaning, "obstacle");

    let placeholder = parse_card_position("?:outcome").unwrap();
    assert!(placeholder.is_placeholder());
    assert_eq!(placeholder.position_meaning, "outcome");

    assert!(matches!(
        parse_card_position("tower"),
        Err(CliError::InvalidCardPosition(_))
    ));
    assert!(matches!(
        parse_card_position("r"),
        Err(CliError::InvalidCardPosition(_))
    ));
}

#[test]
fn build_spread_requires_known_cards() {
    let deck = Deck::bundled().unwrap();

    let empty = build_spread(&deck, SpreadArgs::default(), None);
    assert!(matches!(empty, Err(CliError::EmptySpread)));

    let unknown = SpreadArgs {
        cards: vec!["99".to_string()],
        ..SpreadArgs::default()
    };
    assert!(matches!(
        build_spread(&deck, unknown, None),
        Err(CliError::CardNotFound(99))
    ));

    let args = SpreadArgs {
        client: Some("Ada".to_string()),
        date: NaiveDate::from_ymd_opt(2024, 1, 2),
        cards: vec!["0".to_string(), "?".to_string()],
        ..SpreadArgs::default()
    };
    let record = build_spread(&deck, args, None).unwrap();
    assert_eq!(record.client_name, "Ada");
    assert_eq!(record.date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    assert_eq!(record.cards.len(), 2);
    assert!(record.has_placeholders());
}

#[test]
fn build_spread_update_keeps_unspecified_fields() {
    let deck = Deck::bundled().unwrap();
    let mut existing = spread_with_id("0190aaaa-1");
    existing.question = "Old question".to_string();
    existing.summary = "Keep me".to_string();
    existing.cards = vec![parse_card_position("3").unwrap()];

    let args = SpreadArgs {
        question: Some("New question".to_string()),
        ..SpreadArgs::default()
    };
    let updated = build_spread(&deck, args, Some(existing.clone())).unwrap();

    assert_eq!(updated.id, existing.id);
    assert_eq!(updated.question, "New question");
    assert_eq!(updated.summary, "Keep me");
    assert_eq!(updated.cards, existing.cards);
}

#[test]
fn resolve_spread_supports_exact_and_prefix_id() {
    let spreads = vec![
        spread_with_id("0190aaaa-1"),
        spread_with_id("0190aaaa-10"),
        spread_with_id("0190bbbb"),
    ];

    assert_eq!(
        resolve_spread(&spreads, "0190aaaa-1").unwrap().id.as_str(),
        "0190aaaa-1"
    );
    assert_eq!(
        resolve_spread(&spreads, " 0190b ").unwrap().id.as_str(),
        "0190bbbb"
    );
    assert!(matches!(
        resolve_spread(&spreads, "0190a"),
        Err(CliError::AmbiguousSpreadId(_))
    ));
    assert!(matches!(
        resolve_spread(&spreads, "ffff"),
        Err(CliError::SpreadNotFound(_))
    ));
    assert!(matches!(
        resolve_spread(&spreads, "  "),
        Err(CliError::SpreadNotFound(_))
    ));
}

#[test]
fn format_spread_lists_positions_in_order() {
    let deck = Deck::bundled().unwrap();
    let mut spread = spread_with_id("0190cccc");
    spread.question = "Career?".to_string();
    spread.cards = vec![
        parse_card_position("0:past").unwrap(),
        parse_card_position("1r").unwrap(),
    ];

    let lines = format_spread(&deck, &spread);
    let fool = deck.get(0).unwrap();
    let magician = deck.get(1).unwrap();

    assert_eq!(lines[0], "0190cccc  2024-03-01");
    assert_eq!(lines[1], "Question: Career?");
    assert_eq!(lines[2], format!("  1. {}: past", card_label(fool, false)));
    assert_eq!(lines[3], format!("  2. {}", card_label(magician, true)));
}

#[test]
fn card_label_marks_reversed_cards() {
    let deck = Deck::bundled().unwrap();
    let card = deck.get(0).unwrap();
    assert_eq!(card_label(card, false), format!("{} {}", card.name, card.name_en));
    assert!(card_label(card, true).ends_with("(reversed)"));
}

#[test]
fn preview_truncates_with_ellipsis() {
    let preview = preview("This is a very long question that should be shortened", 20);
    assert_eq!(preview, "This is a very lo...");
}

#[test]
fn format_relative_time_units() {
    let now = 10_000_000_000;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 120_000, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * 60 * 60_000, now), "2h ago");
    assert_eq!(format_relative_time(now - 3 * 24 * 60 * 60_000, now), "3d ago");
}

#[test]
fn config_init_merges_and_validates() {
    let config = merge_config_init(
        ClientConfig::default(),
        ConfigInit {
            supabase_url: Some(" https://demo.supabase.co/ ".to_string()),
            supabase_anon_key: Some("anon-key".to_string()),
            store_path: None,
            no_seed: true,
        },
    )
    .unwrap();
    assert_eq!(config.supabase_url.as_deref(), Some("https://demo.supabase.co"));
    assert_eq!(config.supabase_anon_key.as_deref(), Some("anon-key"));
    assert!(!config.seed_new_documents);

    let kept = merge_config_init(config.clone(), ConfigInit::default()).unwrap();
    assert_eq!(kept, config);

    assert!(matches!(
        merge_config_init(
            ClientConfig::default(),
            ConfigInit {
                supabase_url: Some("demo.supabase.co".to_string()),
                ..ConfigInit::default()
            },
        ),
        Err(CliError::Config(_))
    ));
    assert!(matches!(
        merge_config_init(
            ClientConfig::default(),
            ConfigInit {
                supabase_url: Some("https://demo.supabase.co".to_string()),
                ..ConfigInit::default()
            },
        ),
        Err(CliError::Auth(_))
    ));
}

#[test]
fn mask_key_hides_most_of_the_key() {
    assert_eq!(mask_key("abc"), "***");
    assert_eq!(mask_key("eyJhbGciOiJIUzI1NiJ9"), "eyJhbG...");
}

#[test]
fn settings_prefer_cli_overrides() {
    let tmp = tempdir().unwrap();
    let config_path = tmp.path().join("config.json");
    ClientConfig {
        local_store_path: Some(tmp.path().join("from-config.db")),
        ..ClientConfig::default()
    }
    .save(&config_path)
    .unwrap();

    let override_path = tmp.path().join("override.db");
    let settings = Settings::resolve(Some(config_path.clone()), Some(override_path.clone())).unwrap();
    assert_eq!(settings.config_path, config_path);
    assert_eq!(settings.local_store_path, override_path);
}

#[test]
fn completions_target_the_tarot_binary() {
    for shell in [CompletionShell::Bash, CompletionShell::Zsh, CompletionShell::Fish] {
        let script = String::from_utf8(render_completions(shell)).unwrap();
        assert!(script.contains("tarot"));
        assert!(script.contains("spread"));
    }
}

#[tokio::test]
async fn local_profile_keeps_journal_between_runs() {
    let tmp = tempdir().unwrap();
    let settings = local_settings(tmp.path());

    let app = App::start(&settings).await.unwrap();
    assert_eq!(app.engine.identity(), Identity::signed_in(LOCAL_PROFILE_UID));
    assert!(app.require_remote().is_err());

    run_favorite(&app, 5).unwrap();
    run_note(&app, 12, &["pause".to_string()], false).unwrap();
    let args = SpreadArgs {
        question: Some("Next step?".to_string()),
        cards: vec!["0".to_string(), "13r:obstacle".to_string(), "?".to_string()],
        ..SpreadArgs::default()
    };
    run_spread(&app, SpreadCommands::Add(args)).unwrap();
    app.shutdown().await;

    let app = App::start(&settings).await.unwrap();
    assert!(app.engine.is_favorite(5));
    assert_eq!(app.engine.note(12).as_deref(), Some("pause"));
    let spreads = app.engine.spreads();
    assert_eq!(spreads.len(), 1);
    assert_eq!(spreads[0].question, "Next step?");
    assert_eq!(spreads[0].cards.len(), 2);

    run_favorite(&app, 5).unwrap();
    run_note(&app, 12, &[], true).unwrap();
    let id = spreads[0].id.to_string();
    run_spread(&app, SpreadCommands::Delete { id }).unwrap();
    app.shutdown().await;

    let app = App::start(&settings).await.unwrap();
    assert!(app.engine.favorites().is_empty());
    assert!(app.engine.notes().is_empty());
    assert!(app.engine.spreads().is_empty());
    app.shutdown().await;
}

#[tokio::test]
async fn note_groups_follow_suit_order() {
    let tmp = tempdir().unwrap();
    let app = App::start(&local_settings(tmp.path())).await.unwrap();
    let cup = app
        .deck
        .cards()
        .iter()
        .find(|card| card.category == CardCategory::Cups)
        .unwrap()
        .id;

    run_note(&app, cup, &["feelings".to_string()], false).unwrap();
    run_note(&app, 0, &["leap".to_string()], false).unwrap();

    let lines = format_note_groups(&app, false);
    assert_eq!(lines[0], format!("{} (1)", CardCategory::Major.label()));
    assert!(lines[1].contains(&app.deck.get(0).unwrap().name));
    assert_eq!(lines[2], "      leap");
    assert_eq!(lines[3], format!("{} (1)", CardCategory::Cups.label()));
    assert_eq!(lines[5], "      feelings");
    app.shutdown().await;
}
