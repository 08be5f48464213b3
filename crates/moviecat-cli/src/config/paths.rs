//! Config file location.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Directory under `~/.config` holding moviecat settings.
const APP_DIR: &str = "moviecat";

/// Config file name inside the config directory.
const CONFIG_FILE: &str = "config.toml";

/// Resolves the config file path.
///
/// - With `--dir`, returns `{dir}/config.toml`.
/// - Otherwise returns `~/.config/moviecat/config.toml`.
///
/// # Errors
///
/// Returns an error if `HOME` is not set and no `--dir` was given.
pub fn resolve_config_path(dir: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(d) = dir {
        return Ok(d.join(CONFIG_FILE));
    }

    let home = std::env::var("HOME").context("HOME environment variable is not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join(APP_DIR)
        .join(CONFIG_FILE))
}
