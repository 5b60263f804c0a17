use openai_realtime::DEFAULT_REALTIME_URL;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
///
/// Credentials live here and nowhere else; they are never written to the
/// settings file.
#[derive(Debug)]
pub struct Config {
    pub openai_api_key: SecretString,
    pub tavily_api_key: Option<SecretString>,
    pub realtime_url: String,
    pub settings_path: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY".to_string()))?;
        if !openai_api_key.starts_with("sk-") {
            return Err(ConfigError::InvalidValue(
                "OPENAI_API_KEY".to_string(),
                "API key must start with \"sk-\"".to_string(),
            ));
        }

        let tavily_api_key = std::env::var("TAVILY_API_KEY")
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(SecretString::from);

        let realtime_url =
            std::env::var("REALTIME_URL").unwrap_or_else(|_| DEFAULT_REALTIME_URL.to_string());

        let settings_path = std::env::var("COHOST_SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./cohost-settings.json"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            openai_api_key: SecretString::from(openai_api_key),
            tavily_api_key,
            realtime_url,
            settings_path,
            log_level,
        })
    }
}
