//! Bearer-token sources for authenticated requests.
//!
//! The [`ApiClient`](crate::client::ApiClient) asks a [`CredentialProvider`]
//! for a token before every request. It never reads storage itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;

/// Environment variable that overrides every other token source.
pub const TOKEN_ENV_VAR: &str = "AURORAMIND_TOKEN";

/// Errors raised while persisting a token.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The token file could not be written or removed.
    #[error("failed to access token file '{path}': {source}")]
    Io {
        /// Path to the token file.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No home directory to place the token file in.
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Source of the bearer token attached to API requests.
///
/// Returning `None` sends the request without an `Authorization` header.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current access token, if any.
    async fn token(&self) -> Option<String>;
}

/// A fixed token, or none at all.
///
/// # Examples
///
/// ```
/// use auroramind_core::credentials::{CredentialProvider, StaticCredentials};
///
/// # async fn example() {
/// let creds = StaticCredentials::new("t0ken");
/// assert_eq!(creds.token().await.as_deref(), Some("t0ken"));
/// assert_eq!(StaticCredentials::anonymous().token().await, None);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    /// Always supply `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Never supply a token.
    pub fn anonymous() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn token(&self) -> Option<String> {
        self.token.clone()
    }
}

/// Token persisted in a plain file, written by `aurora login`.
///
/// The file is re-read on every request, so a login in another terminal
/// takes effect without restarting.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    /// Use the token file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Token file under the user config directory
    /// (`~/.config/auroramind/token`).
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::NoHomeDir`] if the home directory is unknown.
    pub fn default_location() -> Result<Self, CredentialsError> {
        let home = dirs::home_dir().ok_or(CredentialsError::NoHomeDir)?;
        Ok(Self::new(home.join(".config/auroramind/token")))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store `token`, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Io`] if the file cannot be written.
    pub async fn save(&self, token: &str) -> Result<(), CredentialsError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        tokio::fs::write(&self.path, token)
            .await
            .map_err(|source| self.io_error(source))?;
        tracing::debug!(path = %self.path.display(), "credentials: token saved");
        Ok(())
    }

    /// Remove the stored token. Succeeds if there was none.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialsError::Io`] if the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<(), CredentialsError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> CredentialsError {
        CredentialsError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl CredentialProvider for TokenFile {
    async fn token(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let token = content.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %self.path.display(), error = %e, "credentials: failed to read token file");
                }
                None
            }
        }
    }
}

/// Pick the token source for `config`.
///
/// Priority: `AURORAMIND_TOKEN` environment variable > `access_token` in
/// config > token file in the user config directory. With none available
/// the client runs anonymously.
pub fn resolve_credentials(config: &Config) -> Arc<dyn CredentialProvider> {
    if let Ok(token) = std::env::var(TOKEN_ENV_VAR) {
        if !token.is_empty() {
            return Arc::new(StaticCredentials::new(token));
        }
    }

    if let Some(token) = config.access_token.as_deref() {
        return Arc::new(StaticCredentials::new(token));
    }

    match TokenFile::default_location() {
        Ok(file) => Arc::new(file),
        Err(e) => {
            tracing::warn!(error = %e, "credentials: no token file location, running anonymously");
            Arc::new(StaticCredentials::anonymous())
        }
    }
}
