//! Upstox access token store
//!
//! The token is kept in an in-memory slot for immediate use and upserted into
//! an env file (`UPSTOX_ACCESS_TOKEN=...`) for the next process start.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Environment variable holding the Upstox access token
pub const ACCESS_TOKEN_ENV: &str = "UPSTOX_ACCESS_TOKEN";

/// Acknowledgement returned by [`TokenStore::save`]
pub const TOKEN_SAVED_MESSAGE: &str = "Token saved successfully to environment and .env file";

/// Token store errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token was empty after trimming
    #[error("Access token cannot be empty")]
    EmptyToken,

    /// Env file could not be read or written
    #[error("Failed to update env file {path}: {source}")]
    EnvFile {
        /// Env file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },
}

/// Access token store backed by an env file
#[derive(Debug, Clone)]
pub struct TokenStore {
    env_file: PathBuf,
    access_token: Arc<RwLock<Option<String>>>,
}

impl TokenStore {
    /// Create a store with an empty token slot
    #[must_use]
    pub fn new(env_file: impl Into<PathBuf>) -> Self {
        Self {
            env_file: env_file.into(),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a store seeded from the process environment.
    ///
    /// Variables from `env_file` are loaded first without overriding values
    /// already present in the environment.
    #[must_use]
    pub fn from_env(env_file: impl Into<PathBuf>) -> Self {
        let env_file = env_file.into();
        if dotenv::from_path(&env_file).is_ok() {
            debug!("Loaded env file {}", env_file.display());
        }

        let token = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Self {
            env_file,
            access_token: Arc::new(RwLock::new(token)),
        }
    }

    /// Path of the backing env file
    #[must_use]
    pub fn env_file(&self) -> &Path {
        &self.env_file
    }

    /// Current access token, if one has been saved or loaded
    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    /// Persist a new access token to the in-memory slot and the env file
    ///
    /// # Errors
    /// Returns an error if the token is blank or the env file cannot be written
    pub async fn save(&self, token: &str) -> Result<&'static str, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken);
        }

        upsert_env_var(&self.env_file, ACCESS_TOKEN_ENV, token)?;
        *self.access_token.write().await = Some(token.to_string());

        info!("Access token saved to {}", self.env_file.display());
        Ok(TOKEN_SAVED_MESSAGE)
    }
}

/// Update or add `key=value` in a flat env file.
///
/// The first line starting with `key=` is replaced; otherwise the line is
/// appended. The file is created when missing.
///
/// # Errors
/// Returns an error if the file cannot be read or written
pub fn upsert_env_var(path: &Path, key: &str, value: &str) -> Result<(), AuthError> {
    let env_err = |source| AuthError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let existing = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(env_err(e)),
    };

    let prefix = format!("{key}=");
    let variable_line = format!("{key}={}", value.trim());

    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();
    match lines.iter_mut().find(|line| line.starts_with(&prefix)) {
        Some(line) => *line = variable_line,
        None => lines.push(variable_line),
    }

    let mut content = lines.join("\n");
    content.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(env_err)?;
    }
    fs::write(path, content).map_err(env_err)?;

    debug!("Upserted {} in {}", key, path.display());
    Ok(())
}
