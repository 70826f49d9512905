//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Variables carry the `HOMEOWNER_INTAKE`
//! prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use homeowner_intake::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod ai;
mod dialogue;
mod error;
mod logging;
mod storage;

pub use ai::{AiConfig, AiProvider};
pub use dialogue::DialogueConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use storage::{StorageBackend, StorageConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a usable
/// in-memory setup apart from the completion API key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Completion provider (OpenAI-compatible endpoint or mock)
    #[serde(default)]
    pub ai: AiConfig,

    /// Conversation and memory storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Dialogue engine tuning
    #[serde(default)]
    pub dialogue: DialogueConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `HOMEOWNER_INTAKE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `HOMEOWNER_INTAKE__AI__API_KEY=sk-...` -> `ai.api_key = ...`
    /// - `HOMEOWNER_INTAKE__STORAGE__BACKEND=file` -> `storage.backend = file`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("HOMEOWNER_INTAKE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.ai.validate()?;
        self.storage.validate()?;
        self.dialogue.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
