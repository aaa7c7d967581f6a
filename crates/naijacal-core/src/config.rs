//! Configuration management for NaijaCal.
//!
//! Loads configuration from ${NAIJACAL_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the backend base URL.
pub const API_URL_ENV: &str = "NAIJACAL_API_URL";

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for NaijaCal configuration and data directories.
    //!
    //! NAIJACAL_HOME resolution order:
    //! 1. NAIJACAL_HOME environment variable (if set)
    //! 2. ~/.config/naijacal (default)

    use std::path::PathBuf;

    /// Returns the NaijaCal home directory.
    ///
    /// Falls back to the current directory when no home directory can be determined.
    pub fn naijacal_home() -> PathBuf {
        if let Ok(home) = std::env::var("NAIJACAL_HOME")
            && !home.trim().is_empty()
        {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("naijacal"))
            .unwrap_or_else(|| PathBuf::from(".naijacal"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        naijacal_home().join("config.toml")
    }

    /// Returns the path to the persisted session credential.
    pub fn credentials_path() -> PathBuf {
        naijacal_home().join("credentials.json")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL (overridden by `NAIJACAL_API_URL`)
    pub api_url: Option<String>,

    /// Timeout for backend requests in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// Optional tracing filter directive (overridden by `NAIJACAL_LOG`)
    pub log_level: Option<String>,
}

impl Config {
    pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u32 = 20;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
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

    /// Returns the configured request timeout, or `None` when disabled.
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    /// Returns the configured base URL if set and non-empty.
    pub fn effective_api_url(&self) -> Option<&str> {
        self.api_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Resolves the backend base URL once for this process.
    ///
    /// Resolution order: `NAIJACAL_API_URL` > config `api_url` > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL is malformed.
    pub fn resolve_api_url(&self) -> Result<String> {
        let env_url = std::env::var(API_URL_ENV).ok();
        resolve_base_url(
            env_url.as_deref(),
            self.effective_api_url(),
            Self::DEFAULT_API_URL,
        )
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            log_level: None,
        }
    }
}

/// Resolves a base URL with precedence: env > config > default.
///
/// Empty or whitespace-only values are treated as unset. A trailing slash is
/// dropped so paths can be appended directly.
///
/// # Errors
/// Returns an error if the selected URL does not parse.
pub fn resolve_base_url(
    env_url: Option<&str>,
    config_url: Option<&str>,
    default_url: &str,
) -> Result<String> {
    let chosen = [env_url, config_url]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(default_url);

    url::Url::parse(chosen).with_context(|| format!("Invalid backend base URL: {chosen}"))?;
    Ok(chosen.trim_end_matches('/').to_string())
}
