use std::path::{Path, PathBuf};

use tarot_core::util::{is_http_url, normalize_text_option};
use tarot_core::ClientConfig;

use crate::cli::ConfigCommands;
use crate::error::CliError;
use crate::settings::{default_config_path, load_file_config, Settings};

/// Values given to `tarot config init`
#[derive(Debug, Default)]
pub struct ConfigInit {
    pub supabase_url: Option<String>,
    pub supabase_anon_key: Option<String>,
    pub store_path: Option<PathBuf>,
    pub no_seed: bool,
}

pub fn run_config(
    command: ConfigCommands,
    config_override: Option<PathBuf>,
    local_store_override: Option<PathBuf>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            store_path,
            no_seed,
        } => {
            let init = ConfigInit {
                supabase_url,
                supabase_anon_key,
                store_path,
                no_seed,
            };
            let config_path = match config_override {
                Some(path) => path,
                None => default_config_path()?,
            };
            run_config_init(&config_path, init)
        }
        ConfigCommands::Show => run_config_show(&Settings::resolve(
            config_override,
            local_store_override,
        )?),
    }
}

pub fn run_config_init(config_path: &Path, init: ConfigInit) -> Result<(), CliError> {
    let existing = load_file_config(config_path)?;
    let config = merge_config_init(existing, init)?;
    config.save(config_path)?;
    println!("Config written to {}", config_path.display());

    if config.supabase_url.is_some() && config.supabase_anon_key.is_some() {
        println!(
            "Remote sync is configured. Run `tarot auth login --email <email> --password <password>`."
        );
    } else {
        println!("No remote configured; favorites and notes stay on this machine.");
    }
    Ok(())
}

/// Apply `config init` values on top of the stored config
pub fn merge_config_init(mut config: ClientConfig, init: ConfigInit) -> Result<ClientConfig, CliError> {
    if let Some(url) = normalize_text_option(init.supabase_url) {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
        config.supabase_url = Some(url.trim_end_matches('/').to_string());
    }
    if let Some(anon_key) = normalize_text_option(init.supabase_anon_key) {
        config.supabase_anon_key = Some(anon_key);
    }
    if let Some(path) = init.store_path {
        config.local_store_path = Some(path);
    }
    if init.no_seed {
        config.seed_new_documents = false;
    }

    config.supabase()?;
    Ok(config)
}

fn run_config_show(settings: &Settings) -> Result<(), CliError> {
    let config = &settings.config;
    println!("config_path: {}", settings.config_path.display());
    println!("local_store: {}", settings.local_store_path.display());
    match config.supabase()? {
        Some(project) => {
            println!("supabase_url: {}", project.url);
            println!("supabase_anon_key: {}", mask_key(&project.anon_key));
        }
        None => println!("remote: (local-only)"),
    }
    println!("seed_new_documents: {}", config.seed_new_documents);
    Ok(())
}

pub fn mask_key(key: &str) -> String {
    let visible = key.chars().take(6).collect::<String>();
    if key.chars().count() <= 6 {
        "*".repeat(key.chars().count())
    } else {
        format!("{visible}...")
    }
}
