//! Config file and local store locations.

use std::path::{Path, PathBuf};

use tarot_core::ClientConfig;

use crate::error::CliError;

const APP_DIR: &str = "tarot";
const CONFIG_FILE: &str = "config.json";
const LOCAL_STORE_FILE: &str = "local.db";

/// Effective settings for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_path: PathBuf,
    pub config: ClientConfig,
    pub local_store_path: PathBuf,
}

impl Settings {
    /// Load the config file, overlay the environment, then CLI flags
    pub fn resolve(
        config_override: Option<PathBuf>,
        local_store_override: Option<PathBuf>,
    ) -> Result<Self, CliError> {
        let config_path = match config_override {
            Some(path) => path,
            None => default_config_path()?,
        };
        let config = ClientConfig::load(&config_path)?.with_env();
        let local_store_path = match local_store_override.or_else(|| config.local_store_path.clone()) {
            Some(path) => path,
            None => default_local_store_path()?,
        };

        Ok(Self {
            config_path,
            config,
            local_store_path,
        })
    }
}

pub fn default_config_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
        .ok_or_else(|| CliError::Config("Failed to resolve the user config directory".into()))
}

pub fn default_local_store_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join(LOCAL_STORE_FILE))
        .ok_or_else(|| CliError::Config("Failed to resolve the user data directory".into()))
}

/// Read the stored config without the environment overlay
pub fn load_file_config(path: &Path) -> Result<ClientConfig, CliError> {
    Ok(ClientConfig::load(path)?)
}
