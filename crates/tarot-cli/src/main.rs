//! Tarot CLI - browse card meanings and keep a reading journal
//!
//! Favorites, notes and spreads follow the signed-in account; without one
//! they stay on this machine.

mod app;
mod auth;
mod cli;
mod commands;
mod error;
mod settings;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::{AppCommands, Cli, Commands};
use crate::commands::auth_cmd::run_auth;
use crate::commands::cards::{run_cards, run_draw, run_show};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::invites::run_invites;
use crate::commands::journal::{run_favorite, run_note, run_notes};
use crate::commands::spread::run_spread;
use crate::error::CliError;
use crate::settings::Settings;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "tarot=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { command } => run_config(command, cli.config, cli.local_store),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::App(command) => {
            let settings = Settings::resolve(cli.config, cli.local_store)?;
            let app = App::start(&settings).await?;
            let result = dispatch(&app, command).await;
            app.shutdown().await;
            result
        }
    }
}

async fn dispatch(app: &App, command: AppCommands) -> Result<(), CliError> {
    match command {
        AppCommands::Cards {
            search,
            filter,
            json,
        } => run_cards(app, &search, filter, json),
        AppCommands::Show { id, aspect, json } => run_show(app, id, aspect, json),
        AppCommands::Favorite { id } => run_favorite(app, id),
        AppCommands::Note { id, text, clear } => run_note(app, id, &text, clear),
        AppCommands::Notes { full } => {
            run_notes(app, full);
            Ok(())
        }
        AppCommands::Spread { command } => run_spread(app, command),
        AppCommands::Draw { json } => run_draw(app, json),
        AppCommands::Auth { command } => run_auth(app, command).await,
        AppCommands::Invites { command } => run_invites(app, command).await,
    }
}
