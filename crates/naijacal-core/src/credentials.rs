//! Session credential storage.
//!
//! Stores the backend access token in `<base>/credentials.json` with restricted
//! permissions (0600). Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Durable storage for a single opaque session token.
///
/// Implementations never inspect the token. A store that cannot be read
/// behaves as if it were empty.
pub trait CredentialStore: Send + Sync {
    /// Persists `token`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the token could not be written.
    fn save(&self, token: &str) -> Result<()>;

    /// Returns the stored token, if any.
    fn load(&self) -> Option<String>;

    /// Removes the stored token. Returns whether a token was present.
    ///
    /// # Errors
    /// Returns an error if the backing storage could not be updated.
    fn clear(&self) -> Result<bool>;
}

/// On-disk layout of the credentials file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
}

/// Token store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location under `NAIJACAL_HOME`.
    pub fn default_location() -> Self {
        Self::new(paths::credentials_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<CredentialsFile> {
        if !self.path.exists() {
            return Ok(CredentialsFile::default());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials from {}", self.path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials from {}", self.path.display()))
    }

    fn write(&self, file: &CredentialsFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(file).context("Failed to serialize credentials")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut handle = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            handle
                .write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, token: &str) -> Result<()> {
        self.write(&CredentialsFile {
            access_token: Some(token.to_string()),
        })
    }

    fn load(&self) -> Option<String> {
        match self.read() {
            Ok(file) => file.access_token.filter(|t| !t.is_empty()),
            Err(err) => {
                tracing::warn!("credential store unavailable, treating as empty: {err:#}");
                None
            }
        }
    }

    fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        let had_token = self
            .read()
            .map(|file| file.access_token.is_some())
            .unwrap_or(true);
        fs::remove_file(&self.path)
            .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        Ok(had_token)
    }
}

/// In-process token store; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn save(&self, token: &str) -> Result<()> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_poisoned| anyhow::anyhow!("credential store lock poisoned"))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn load(&self) -> Option<String> {
        self.token.lock().ok().and_then(|slot| slot.clone())
    }

    fn clear(&self) -> Result<bool> {
        let mut slot = self
            .token
            .lock()
            .map_err(|_poisoned| anyhow::anyhow!("credential store lock poisoned"))?;
        Ok(slot.take().is_some())
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
