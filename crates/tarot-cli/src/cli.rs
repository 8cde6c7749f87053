use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tarot_core::search::CardFilter;
use tarot_core::Aspect;

#[derive(Parser)]
#[command(name = "tarot")]
#[command(about = "Browse tarot meanings and keep a reading journal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Optional path to the local store database
    #[arg(long, global = true, value_name = "PATH")]
    pub local_store: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(flatten)]
    App(AppCommands),
    /// Configure the CLI
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

/// Commands that run against the local store and the account session
#[derive(Subcommand)]
pub enum AppCommands {
    /// List cards in the deck
    #[command(alias = "ls")]
    Cards {
        /// Substring of the card name
        #[arg(short, long, default_value = "")]
        search: String,
        /// all, favorites, major, wands, cups, swords or pentacles
        #[arg(short, long, default_value = "all")]
        filter: CardFilter,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one card with its interpretations
    Show {
        /// Card id
        id: u32,
        /// Only print one aspect (love, career, wealth, growth)
        #[arg(short, long)]
        aspect: Option<Aspect>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Toggle a card in favorites
    #[command(alias = "fav")]
    Favorite {
        /// Card id
        id: u32,
    },
    /// Print, set or clear the note on a card
    Note {
        /// Card id
        id: u32,
        /// New note text (stdin when piped)
        text: Vec<String>,
        /// Remove the note
        #[arg(long, conflicts_with = "text")]
        clear: bool,
    },
    /// List all card notes grouped by suit
    Notes {
        /// Print notes without truncation
        #[arg(long)]
        full: bool,
    },
    /// Manage recorded spreads
    Spread {
        #[command(subcommand)]
        command: SpreadCommands,
    },
    /// Draw a random card
    Draw {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sign in, sign up or out of the journal account
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Manage sign-up invite codes
    Invites {
        #[command(subcommand)]
        command: InviteCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SpreadCommands {
    /// List spreads, most recently updated first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one spread
    Show {
        /// Spread ID or unique ID prefix
        id: String,
    },
    /// Record a new spread or update an existing one
    Add(SpreadArgs),
    /// Delete a spread
    Delete {
        /// Spread ID or unique ID prefix
        id: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct SpreadArgs {
    /// Update the spread with this ID or unique ID prefix
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,
    /// The question asked
    #[arg(short, long)]
    pub question: Option<String>,
    /// Who the reading was for
    #[arg(long)]
    pub client: Option<String>,
    /// Reading date (YYYY-MM-DD, default today)
    #[arg(long, value_name = "DATE")]
    pub date: Option<chrono::NaiveDate>,
    /// Card position as ID[r][:MEANING]; `?` leaves the position unassigned
    #[arg(short, long = "card", value_name = "CARD")]
    pub cards: Vec<String>,
    /// Interpretation text
    #[arg(short, long)]
    pub interpretation: Option<String>,
    /// Summary text
    #[arg(long)]
    pub summary: Option<String>,
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password and store the session in the keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account with an invite code
    Signup {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Invite code
        #[arg(long, value_name = "CODE")]
        invite: String,
    },
    /// Show the current session
    Status,
    /// Sign out and clear the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum InviteCommands {
    /// Generate fresh invite codes
    Generate {
        /// Number of codes
        #[arg(default_value = "1")]
        count: usize,
        /// Store the codes in the remote invite table (requires sign-in)
        #[arg(long)]
        upload: bool,
        /// Also write the codes as JSON to this path
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update the config file
    Init {
        /// Supabase project URL
        #[arg(long, value_name = "URL")]
        supabase_url: Option<String>,
        /// Supabase anon/public key
        #[arg(long, value_name = "KEY")]
        supabase_anon_key: Option<String>,
        /// Local store database path to save in the config
        #[arg(long, value_name = "PATH")]
        store_path: Option<PathBuf>,
        /// Create new remote documents empty instead of from local state
        #[arg(long)]
        no_seed: bool,
    },
    /// Print the effective configuration
    Show,
}
