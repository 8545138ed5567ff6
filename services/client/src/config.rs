//! services/client/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: String,
    pub backend_api_key: String,
    /// A previously stored access token, when a session should be restored.
    pub backend_access_token: Option<String>,
    pub log_level: Level,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_from: String,
    pub camera_frames_dir: PathBuf,
    pub camera_frame_interval_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Backend Settings ---
        let backend_url = std::env::var("BACKEND_URL")
            .map_err(|_| ConfigError::MissingVar("BACKEND_URL".to_string()))?;
        let backend_api_key = std::env::var("BACKEND_API_KEY")
            .map_err(|_| ConfigError::MissingVar("BACKEND_API_KEY".to_string()))?;
        let backend_access_token = std::env::var("BACKEND_ACCESS_TOKEN").ok();

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Email Delivery Settings ---
        let smtp_host = std::env::var("SMTP_HOST")
            .map_err(|_| ConfigError::MissingVar("SMTP_HOST".to_string()))?;
        let smtp_port_str = std::env::var("SMTP_PORT").unwrap_or_else(|_| "587".to_string());
        let smtp_port = smtp_port_str.parse::<u16>().map_err(|e| {
            ConfigError::InvalidValue("SMTP_PORT".to_string(), e.to_string())
        })?;
        let smtp_username = std::env::var("SMTP_USERNAME")
            .map_err(|_| ConfigError::MissingVar("SMTP_USERNAME".to_string()))?;
        let smtp_password = std::env::var("SMTP_PASSWORD")
            .map_err(|_| ConfigError::MissingVar("SMTP_PASSWORD".to_string()))?;
        let smtp_from = std::env::var("SMTP_FROM")
            .map_err(|_| ConfigError::MissingVar("SMTP_FROM".to_string()))?;

        // --- Load Capture Device Settings ---
        let camera_frames_dir = std::env::var("CAMERA_FRAMES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./frames"));
        let camera_frame_interval_str =
            std::env::var("CAMERA_FRAME_INTERVAL_MS").unwrap_or_else(|_| "33".to_string());
        let camera_frame_interval_ms = camera_frame_interval_str.parse::<u64>().map_err(|e| {
            ConfigError::InvalidValue("CAMERA_FRAME_INTERVAL_MS".to_string(), e.to_string())
        })?;

        Ok(Self {
            backend_url,
            backend_api_key,
            backend_access_token,
            log_level,
            smtp_host,
            smtp_port,
            smtp_username,
            smtp_password,
            smtp_from,
            camera_frames_dir,
            camera_frame_interval_ms,
        })
    }
}
