//! Configuration management for the FetchMate client.
//!
//! Loads configuration from ${FETCHMATE_HOME}/config.toml with sensible
//! defaults. A single base-URL setting points at the remote API; it can be
//! overridden externally via `FETCHMATE_BASE_URL`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Default API endpoint for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// Environment variable that overrides the configured base URL.
pub const BASE_URL_ENV: &str = "FETCHMATE_BASE_URL";

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the remote FetchMate API.
    pub base_url: String,

    /// Directory downloaded files are written to (default: cwd).
    pub download_dir: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            download_dir: None,
        }
    }
}

impl Config {
    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the commented default template to `path`.
    ///
    /// # Errors
    /// Fails if a config file already exists there.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config already exists at {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Resolves the base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the winning value is not a valid URL.
    pub fn resolve_base_url(&self) -> Result<String> {
        let env_value = std::env::var(BASE_URL_ENV).ok();
        resolve_base_url_from(env_value.as_deref(), &self.base_url)
    }

    /// Resolves the download directory: config value or the cwd.
    pub fn resolve_download_dir(&self) -> PathBuf {
        self.download_dir
            .as_deref()
            .map_or_else(|| PathBuf::from("."), PathBuf::from)
    }
}

fn resolve_base_url_from(env_value: Option<&str>, config_value: &str) -> Result<String> {
    if let Some(env_url) = env_value {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    let trimmed = config_value.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_BASE_URL.to_string());
    }
    validate_url(trimmed)?;
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid API base URL: {url}"))?;
    Ok(())
}

pub mod paths {
    //! Path resolution for FetchMate configuration and session data.
    //!
    //! FETCHMATE_HOME resolution order:
    //! 1. FETCHMATE_HOME environment variable (if set)
    //! 2. ~/.config/fetchmate (default)

    use std::path::PathBuf;

    /// Returns the FetchMate home directory.
    pub fn fetchmate_home() -> PathBuf {
        if let Ok(home) = std::env::var("FETCHMATE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("fetchmate"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        fetchmate_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        fetchmate_home().join("session.json")
    }
}
