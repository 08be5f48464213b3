//! `AppConfig` struct and TOML read/write.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use moviecat_api::catalog::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};

/// Results per page when neither config nor `--limit` sets one.
const DEFAULT_PAGE_SIZE: u32 = 12;

/// Top-level application configuration.
#[derive(Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Catalog API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Search defaults.
    #[serde(default)]
    pub search: SearchConfig,
}

/// Catalog API configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL; every endpoint path is relative to it.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// User-Agent override (default: `moviecat/<version>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Extra headers sent with every catalog request.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: None,
            headers: BTreeMap::new(),
        }
    }
}

/// Search configuration.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchConfig {
    /// Results per page when `--limit` is omitted.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    String::from(DEFAULT_BASE_URL)
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl AppConfig {
    /// Loads config from a TOML file. Returns default if file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Saves config to a TOML file, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or file write fails.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("failed to serialize config to TOML")?;
        std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Writes the default config, refusing to overwrite an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<Self> {
        if path.exists() {
            bail!("config file already exists: {}", path.display());
        }
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }
}
