//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use voice_orchestrator_core::Language;

use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Turn handling
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Sentence segmentation
    #[serde(default)]
    pub segmenter: SegmenterConfig,

    /// Session hosting
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging and metrics
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate settings from an inline TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_orchestrator()?;
        self.validate_segmenter()?;
        self.validate_session()?;
        self.validate_observability()?;
        Ok(())
    }

    fn validate_orchestrator(&self) -> Result<(), ConfigError> {
        if self.orchestrator.default_session_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.default_session_id".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        if self.orchestrator.assistant_stream_id < 0 {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.assistant_stream_id".to_string(),
                message: format!(
                    "Must be non-negative, got {}",
                    self.orchestrator.assistant_stream_id
                ),
            });
        }

        Ok(())
    }

    fn validate_segmenter(&self) -> Result<(), ConfigError> {
        self.segmenter.language().map(|_| ())
    }

    fn validate_session(&self) -> Result<(), ConfigError> {
        if self.session.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.channel_capacity".to_string(),
                message: "Channel capacity must be at least 1".to_string(),
            });
        }

        if self.session.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_sessions".to_string(),
                message: "At least one session must be allowed".to_string(),
            });
        }

        Ok(())
    }

    fn validate_observability(&self) -> Result<(), ConfigError> {
        const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

        let level = self.observability.log_level.to_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "observability.log_level".to_string(),
                message: format!(
                    "Unknown level '{}', expected one of {:?}",
                    self.observability.log_level, LEVELS
                ),
            });
        }

        if self.observability.metrics_enabled && self.observability.prometheus_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "observability.prometheus_port".to_string(),
                message: "Port must be set when metrics are enabled".to_string(),
            });
        }

        Ok(())
    }
}

/// Turn handling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Partial recognizer text longer than this (in characters) interrupts
    /// the assistant
    #[serde(default = "default_interrupt_min_chars")]
    pub interrupt_min_chars: usize,

    /// Session id used when the recognizer metadata carries none
    #[serde(default = "default_session_id")]
    pub default_session_id: String,

    /// Stream id stamped on assistant transcript lines
    #[serde(default = "default_assistant_stream_id")]
    pub assistant_stream_id: i64,

    /// User stream id when the session id is not numeric
    #[serde(default)]
    pub fallback_user_stream_id: i64,

    /// Spoken when the first participant joins
    #[serde(default)]
    pub greeting: Option<String>,
}

fn default_interrupt_min_chars() -> usize {
    2
}

fn default_session_id() -> String {
    "100".to_string()
}

fn default_assistant_stream_id() -> i64 {
    100
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            interrupt_min_chars: default_interrupt_min_chars(),
            default_session_id: default_session_id(),
            assistant_stream_id: default_assistant_stream_id(),
            fallback_user_stream_id: 0,
            greeting: None,
        }
    }
}

/// Sentence segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Response language; adds its script's terminal punctuation
    #[serde(default = "default_language")]
    pub language: String,

    /// Also split on clause breaks (commas, semicolons)
    #[serde(default)]
    pub clause_breaks: bool,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            clause_breaks: false,
        }
    }
}

impl SegmenterConfig {
    /// Resolved language
    pub fn language(&self) -> Result<Language, ConfigError> {
        Language::from_str_loose(&self.language).ok_or_else(|| ConfigError::InvalidValue {
            field: "segmenter.language".to_string(),
            message: format!("Unknown language '{}'", self.language),
        })
    }
}

/// Session hosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bounded event queue per session coordinator
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Maximum concurrent sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_channel_capacity() -> usize {
    256
}

fn default_max_sessions() -> usize {
    64
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Install the Prometheus exporter
    #[serde(default)]
    pub metrics_enabled: bool,

    /// Prometheus scrape port
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_prometheus_port() -> u16 {
    9090
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: false,
            prometheus_port: default_prometheus_port(),
        }
    }
}

/// Load settings from `config/` in the working directory
///
/// Sources, later overriding earlier:
/// 1. `config/default.{toml,yaml,json}`
/// 2. `config/{env}.{toml,yaml,json}`
/// 3. `VOICE_ORCH_` environment variables, e.g. `VOICE_ORCH_SESSION__MAX_SESSIONS=8`
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from an explicit configuration directory
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    let default_path = dir.join("default");
    builder = builder.add_source(File::with_name(&default_path.to_string_lossy()).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        let env_path = dir.join(env_name);
        builder = builder.add_source(File::with_name(&env_path.to_string_lossy()).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("VOICE_ORCH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    tracing::debug!(
        dir = %dir.display(),
        env = env.unwrap_or("none"),
        "Loaded settings"
    );

    Ok(settings)
}
