//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
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
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// CORS allow-list entry for the browser frontend.
    pub frontend_url: String,
    /// Root directory for uploaded files, partitioned per user below it.
    pub upload_dir: PathBuf,
    /// Base URL of the internal AI backend; absent means the primary
    /// provider is unconfigured and the pipeline starts at the fallback.
    pub ai_service_url: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,
    pub firebase_project_id: Option<String>,
    /// Web API key for the identity provider's token-lookup endpoint.
    pub firebase_api_key: Option<String>,
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

        // --- Load Server and Database Settings ---
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?,
            Err(_) => 3001,
        };
        let bind_address = SocketAddr::from(([0, 0, 0, 0], port));

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));

        // --- Load AI Backend Settings (all optional; the pipeline degrades) ---
        let ai_service_url = std::env::var("AI_SERVICE_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string());
        let openrouter_api_key = std::env::var("OPENROUTER_API_KEY").ok();
        let openrouter_model = std::env::var("OPENROUTER_MODEL")
            .unwrap_or_else(|_| "mistralai/mistral-7b-instruct".to_string());

        // --- Load Identity Provider Settings ---
        let firebase_project_id = std::env::var("FIREBASE_PROJECT_ID").ok();
        let firebase_api_key = std::env::var("FIREBASE_API_KEY").ok();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            frontend_url,
            upload_dir,
            ai_service_url,
            openrouter_api_key,
            openrouter_model,
            firebase_project_id,
            firebase_api_key,
        })
    }
}
