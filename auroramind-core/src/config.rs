//! Configuration management for AuroraMind.
//!
//! Provides configuration loading from TOML files with support for
//! multiple file locations and sensible defaults.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the configuration file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as TOML.
    #[error("failed to parse config file '{path}': {source}")]
    ParseError {
        /// Path to the configuration file that could not be parsed.
        path: PathBuf,
        /// The underlying TOML parse error.
        source: toml::de::Error,
    },
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Base URL of the AuroraMind backend, without a trailing `/api/v1`.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Access token to send as a bearer credential. When absent the token
    /// saved by `aurora login` is used.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Knowledge-base chat settings.
    #[serde(default)]
    pub knowledge: Option<KnowledgeConfig>,

    /// Goal breakdown settings.
    #[serde(default)]
    pub goals: Option<GoalsConfig>,
}

/// Knowledge-base chat configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KnowledgeConfig {
    /// Number of document chunks retrieved per question.
    #[serde(default = "default_top_k")]
    pub top_k: u32,
}

/// Goal breakdown configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GoalsConfig {
    /// Model the backend should use when breaking a goal into steps.
    #[serde(default = "default_breakdown_model")]
    pub breakdown_model: String,
}

fn default_api_base() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_top_k() -> u32 {
    5
}

fn default_breakdown_model() -> String {
    "gpt-3.5-turbo".to_string()
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

impl Default for GoalsConfig {
    fn default() -> Self {
        Self {
            breakdown_model: default_breakdown_model(),
        }
    }
}

impl Config {
    /// Load configuration from file system.
    ///
    /// Priority order:
    /// 1. AURORAMIND_CONFIG environment variable
    /// 2. ./config.toml (local directory)
    /// 3. ~/.config/auroramind/config.toml (user config)
    ///
    /// Returns default config if no config file found.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if a found file cannot be read.
    /// Returns [`ConfigError::ParseError`] if a found file is not valid TOML.
    pub fn load() -> Result<Self, ConfigError> {
        // 1. Environment variable (highest priority)
        if let Ok(path) = std::env::var("AURORAMIND_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                return Self::load_from(p);
            }
        }

        // 2. Local directory
        let local = PathBuf::from("config.toml");
        if local.exists() {
            return Self::load_from(local);
        }

        // 3. User config directory (~/.config/auroramind/)
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config/auroramind/config.toml");
            if user_config.exists() {
                return Self::load_from(user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read.
    /// Returns [`ConfigError::ParseError`] if the file is not valid TOML.
    pub fn load_from(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Retrieval breadth for knowledge-base questions.
    pub fn top_k(&self) -> u32 {
        self.knowledge.clone().unwrap_or_default().top_k
    }

    /// Model name for AI goal breakdowns.
    pub fn breakdown_model(&self) -> String {
        self.goals.clone().unwrap_or_default().breakdown_model
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            access_token: None,
            knowledge: None,
            goals: None,
        }
    }
}
