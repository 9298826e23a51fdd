//! Configuration management for the voice turn orchestrator
//!
//! Supports loading configuration from:
//! - TOML/YAML/JSON files (`config/default`, then `config/{env}`)
//! - Environment variables (VOICE_ORCH_ prefix, `__` section separator)
//! - Inline TOML, for tests and embedding

pub mod settings;

pub use settings::{
    load_settings, load_settings_from, ObservabilityConfig, OrchestratorConfig,
    RuntimeEnvironment, SegmenterConfig, SessionConfig, Settings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::FileNotFound(key),
            other => ConfigError::ParseError(other.to_string()),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
