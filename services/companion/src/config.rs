//! services/companion/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use tracing::Level;

/// Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_MODEL_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: Level,
    pub storage_dir: PathBuf,
    pub gemini_api_key: Option<String>,
    pub model_api_base: String,
    pub chat_model: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    /// A missing API key is not an error; see [`Config::api_key_configured`].
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let storage_dir = std::env::var("STORAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./calmmind_data"));
        if storage_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "STORAGE_DIR".to_string(),
                "path must not be empty".to_string(),
            ));
        }

        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let model_api_base = std::env::var("MODEL_API_BASE")
            .unwrap_or_else(|_| DEFAULT_MODEL_API_BASE.to_string());
        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| DEFAULT_CHAT_MODEL.to_string());

        Ok(Self {
            log_level,
            storage_dir,
            gemini_api_key,
            model_api_base,
            chat_model,
        })
    }

    /// Whether a non-empty credential was supplied.
    pub fn api_key_configured(&self) -> bool {
        self.gemini_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }
}
