//! User configuration for dstrk
//!
//! Stored at `~/.config/dstrk/config.toml` (Linux/macOS) or
//! `%APPDATA%\dstrk\config.toml` (Windows). Every field is optional.

use crate::util::expand_tilde;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Store used when nothing else is configured
pub const DEFAULT_STORE: &str = "~/.dstrk";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Store root; `~` is expanded
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level used without `-v` (default: warn)
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir().map(|h| h.join(".config/dstrk"))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir().map(|c| c.join("dstrk"))
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration, falling back to defaults when no file exists
pub fn load() -> Result<Config> {
    match config_file_path() {
        Some(path) => load_from(&path),
        None => Ok(Config::default()),
    }
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config at {}", path.display()))?;

    toml::from_str(&content).with_context(|| format!("Failed to parse config at {}", path.display()))
}

/// Store root: `--dbpath` / `DSTRK_DBPATH`, then config, then `~/.dstrk`
pub fn store_root(flag: Option<&str>, config: &Config) -> Result<PathBuf> {
    let raw = flag
        .or(config.store.path.as_deref())
        .unwrap_or(DEFAULT_STORE);
    expand_tilde(raw)
}
