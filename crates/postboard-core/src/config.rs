//! Application configuration management.
//!
//! Holds the backend base URL, the session storage backend and the last
//! username entered on the login form. Stored at
//! `~/.config/postboard/config.json`; environment variables override the
//! file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{FileStorage, KeyringStorage, SessionStorage};

/// Application name used for config/data directory paths
const APP_NAME: &str = "postboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend prefix used when nothing is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Overrides `api_base_url`
pub const ENV_API_URL: &str = "POSTBOARD_API_URL";

/// Overrides `storage` (`file` or `keyring`)
pub const ENV_STORAGE: &str = "POSTBOARD_STORAGE";

/// Where the session is persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StorageBackend::File),
            "keyring" | "keychain" => Ok(StorageBackend::Keyring),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub storage: StorageBackend,
    #[serde(default)]
    pub last_username: Option<String>,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            storage: StorageBackend::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Read the config file, or defaults when there is none. Environment
    /// overrides are applied separately with [`Config::apply_env_overrides`].
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config")?
        } else {
            Self::default()
        };
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    /// Apply overrides from a variable lookup. Invalid values are skipped
    /// and returned as messages for the caller to report once logging is up.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
        let mut ignored = Vec::new();
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(backend) = lookup(ENV_STORAGE) {
            match backend.parse() {
                Ok(backend) => self.storage = backend,
                Err(e) => ignored.push(format!("Ignoring {}: {}", ENV_STORAGE, e)),
            }
        }
        ignored
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the session file and logs
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Build the configured session storage backend.
    pub fn session_storage(&self, data_dir: PathBuf) -> Arc<dyn SessionStorage> {
        match self.storage {
            StorageBackend::File => Arc::new(FileStorage::new(data_dir)),
            StorageBackend::Keyring => Arc::new(KeyringStorage::new()),
        }
    }
}
