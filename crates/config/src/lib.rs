//! Process-wide configuration for the tone-rewriting pipeline.
//!
//! Reloaded only on restart (§6): per-stage models/temperatures/token
//! limits, gating thresholds, retry policy, and the ambient server/
//! observability settings layered the way the teacher's
//! `config::Config::builder()` does.

pub mod pipeline;
pub mod settings;

pub use pipeline::{GatingThresholds, PipelineConfig, StageModelConfig, StageModels};
pub use settings::{load_settings, LlmConfig, ObservabilityConfig, RuntimeEnvironment, ServerConfig, Settings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for tone_core::Error {
    fn from(err: ConfigError) -> Self {
        tone_core::Error::Configuration(err.to_string())
    }
}
