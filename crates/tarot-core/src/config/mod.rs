//! Client configuration.
//!
//! A JSON file provides the base values; environment variables override them.
//! Text values are trimmed and blanks count as unset. The Supabase URL and
//! anon key are public, safe-to-ship values; no secrets belong here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::auth::{resolve_optional_supabase_config, AuthResult};
use crate::error::Result;
use crate::sync::{NewDocumentSeed, SyncOptions};
use crate::util::{is_http_url, normalize_text_option};

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_LOCAL_STORE: &str = "TAROT_LOCAL_STORE";

/// Public Supabase project coordinates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseProject {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supabase_anon_key: Option<String>,
    /// Local store database file; the caller picks a default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_store_path: Option<PathBuf>,
    /// Seed a newly created remote document from the pre-sign-in state
    #[serde(default = "default_seed_new_documents")]
    pub seed_new_documents: bool,
}

const fn default_seed_new_documents() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_anon_key: None,
            local_store_path: None,
            seed_new_documents: default_seed_new_documents(),
        }
    }
}

impl ClientConfig {
    /// Read a config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config.normalized())
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(self)?;
        std::fs::write(path, payload)?;
        Ok(())
    }

    /// Overlay values from the process environment
    #[must_use]
    pub fn with_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay values from an arbitrary variable lookup
    #[must_use]
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = normalize_text_option(lookup(ENV_SUPABASE_URL)) {
            self.supabase_url = Some(url);
        }
        if let Some(anon_key) = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY)) {
            self.supabase_anon_key = Some(anon_key);
        }
        if let Some(path) = normalize_text_option(lookup(ENV_LOCAL_STORE)) {
            self.local_store_path = Some(PathBuf::from(path));
        }
        self.normalized()
    }

    /// The configured Supabase project, if any.
    ///
    /// Only one of URL and anon key being set is `NotConfigured`; a URL
    /// without a scheme is `InvalidConfiguration`.
    pub fn supabase(&self) -> AuthResult<Option<SupabaseProject>> {
        let resolved =
            resolve_optional_supabase_config(self.supabase_url.clone(), self.supabase_anon_key.clone())?;
        let Some((url, anon_key)) = resolved else {
            return Ok(None);
        };
        if !is_http_url(&url) {
            return Err(crate::auth::AuthError::InvalidConfiguration(
                "Supabase URL must include http:// or https://",
            ));
        }
        Ok(Some(SupabaseProject { url, anon_key }))
    }

    #[must_use]
    pub const fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            new_document_seed: if self.seed_new_documents {
                NewDocumentSeed::SessionState
            } else {
                NewDocumentSeed::Empty
            },
        }
    }

    fn normalized(mut self) -> Self {
        self.supabase_url = normalize_text_option(self.supabase_url.take());
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key.take());
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::auth::AuthError;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn missing_file_yields_local_only_defaults() {
        let tmp = tempdir().unwrap();
        let config = ClientConfig::load(&tmp.path().join("config.json")).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert!(config.supabase().unwrap().is_none());
        assert_eq!(config.sync_options().new_document_seed, NewDocumentSeed::SessionState);
    }

    #[test]
    fn env_overrides_file_values() {
        let config = ClientConfig {
            supabase_url: Some("https://file.supabase.co".to_string()),
            supabase_anon_key: Some("file-key".to_string()),
            ..ClientConfig::default()
        }
        .with_lookup(lookup(&[
            (ENV_SUPABASE_URL, " https://env.supabase.co "),
            (ENV_SUPABASE_ANON_KEY, "   "),
            (ENV_LOCAL_STORE, "/tmp/tarot.db"),
        ]));

        let project = config.supabase().unwrap().unwrap();
        assert_eq!(project.url, "https://env.supabase.co");
        assert_eq!(project.anon_key, "file-key");
        assert_eq!(config.local_store_path, Some(PathBuf::from("/tmp/tarot.db")));
    }

    #[test]
    fn half_configured_remote_is_an_error() {
        let config = ClientConfig::default().with_lookup(lookup(&[(ENV_SUPABASE_ANON_KEY, "key")]));
        assert!(matches!(config.supabase(), Err(AuthError::NotConfigured)));

        let config = ClientConfig::default().with_lookup(lookup(&[
            (ENV_SUPABASE_URL, "demo.supabase.co"),
            (ENV_SUPABASE_ANON_KEY, "key"),
        ]));
        assert!(matches!(config.supabase(), Err(AuthError::InvalidConfiguration(_))));
    }

    #[test]
    fn save_then_load_keeps_values() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("tarot").join("config.json");
        let config = ClientConfig {
            supabase_url: Some("https://demo.supabase.co".to_string()),
            supabase_anon_key: Some("anon".to_string()),
            local_store_path: None,
            seed_new_documents: false,
        };
        config.save(&path).unwrap();

        let loaded = ClientConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.sync_options().new_document_seed, NewDocumentSeed::Empty);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"supabase_project":"demo"}"#).unwrap();
        assert!(ClientConfig::load(&path).is_err());
    }
}
