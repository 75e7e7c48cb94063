//! Per-stage model selection, temperatures, and gating thresholds (§6).

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Model, temperature and token budget for one LLM-backed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl StageModelConfig {
    fn fast(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            temperature,
            max_tokens,
        }
    }
}

/// Model assignment per pipeline stage. The Structure Labeler and the
/// gated preprocessing calls run on the small/fast model; the
/// Streaming Generator runs on the larger model (§6: "labeling: fast
/// small model, final: larger model").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageModels {
    pub identity_booster: StageModelConfig,
    pub segment_refiner: StageModelConfig,
    pub structure_labeler: StageModelConfig,
    pub situation_analyzer: StageModelConfig,
    pub context_gating: StageModelConfig,
    pub final_generation: StageModelConfig,
}

impl Default for StageModels {
    fn default() -> Self {
        let fast = "claude-3-5-haiku-20241022";
        let large = "claude-sonnet-4-20250514";
        Self {
            identity_booster: StageModelConfig::fast(fast, 0.2, 256),
            segment_refiner: StageModelConfig::fast(fast, 0.2, 512),
            structure_labeler: StageModelConfig::fast(fast, 0.1, 1024),
            situation_analyzer: StageModelConfig::fast(fast, 0.1, 768),
            context_gating: StageModelConfig::fast(fast, 0.1, 256),
            final_generation: StageModelConfig::fast(large, 0.7, 2048),
        }
    }
}

/// Gating thresholds deciding whether an optional LLM call fires (§4.4, §4.9, §4.11, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatingThresholds {
    #[serde(default = "default_identity_booster_min_text_length")]
    pub identity_booster_min_text_length: usize,
    #[serde(default = "default_identity_booster_max_locked_spans")]
    pub identity_booster_max_locked_spans: usize,
    #[serde(default = "default_situation_analysis_min_text_length")]
    pub situation_analysis_min_text_length: usize,
    #[serde(default = "default_situation_analysis_min_transition_words")]
    pub situation_analysis_min_transition_words: usize,
    #[serde(default = "default_context_gating_override_confidence_threshold")]
    pub context_gating_override_confidence_threshold: f32,
    /// Meaning Segmenter force-split length bound (§4.5).
    #[serde(default = "default_max_segment_chars")]
    pub max_segment_chars: usize,
    /// Segment Refiner fires when any segment exceeds this length (§4.6).
    #[serde(default = "default_segment_refine_trigger_chars")]
    pub segment_refine_trigger_chars: usize,
}

fn default_identity_booster_min_text_length() -> usize {
    80
}
fn default_identity_booster_max_locked_spans() -> usize {
    1
}
fn default_situation_analysis_min_text_length() -> usize {
    600
}
fn default_situation_analysis_min_transition_words() -> usize {
    8
}
fn default_context_gating_override_confidence_threshold() -> f32 {
    0.72
}
fn default_max_segment_chars() -> usize {
    180
}
fn default_segment_refine_trigger_chars() -> usize {
    150
}

impl Default for GatingThresholds {
    fn default() -> Self {
        Self {
            identity_booster_min_text_length: default_identity_booster_min_text_length(),
            identity_booster_max_locked_spans: default_identity_booster_max_locked_spans(),
            situation_analysis_min_text_length: default_situation_analysis_min_text_length(),
            situation_analysis_min_transition_words: default_situation_analysis_min_transition_words(),
            context_gating_override_confidence_threshold: default_context_gating_override_confidence_threshold(),
            max_segment_chars: default_max_segment_chars(),
            segment_refine_trigger_chars: default_segment_refine_trigger_chars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub models: StageModels,
    #[serde(default)]
    pub gating: GatingThresholds,
    /// §4.16/§6: a failed validator run is retried exactly once.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    /// §5: whole-request wall-clock budget, in seconds.
    #[serde(default = "default_wall_clock_seconds")]
    pub wall_clock_seconds: u64,
    /// §5: individual LLM calls inherit a provider-level HTTP timeout.
    #[serde(default = "default_llm_http_timeout_seconds")]
    pub llm_http_timeout_seconds: u64,
    /// Retry temperature the Output Validator's retry path lowers to (§4.16).
    #[serde(default = "default_retry_temperature")]
    pub retry_temperature: f32,
    /// Label coverage floor the Structure Labeler must clear (§4.7, §8 inv. 3).
    #[serde(default = "default_label_coverage_threshold")]
    pub label_coverage_threshold: f32,
}

fn default_retry_count() -> u32 {
    1
}
fn default_wall_clock_seconds() -> u64 {
    120
}
fn default_llm_http_timeout_seconds() -> u64 {
    30
}
fn default_retry_temperature() -> f32 {
    0.3
}
fn default_label_coverage_threshold() -> f32 {
    0.6
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            models: StageModels::default(),
            gating: GatingThresholds::default(),
            retry_count: default_retry_count(),
            wall_clock_seconds: default_wall_clock_seconds(),
            llm_http_timeout_seconds: default_llm_http_timeout_seconds(),
            retry_temperature: default_retry_temperature(),
            label_coverage_threshold: default_label_coverage_threshold(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wall_clock_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.wall_clock_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.label_coverage_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.label_coverage_threshold".to_string(),
                message: "must be between 0 and 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.gating.context_gating_override_confidence_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.gating.context_gating_override_confidence_threshold".to_string(),
                message: "must be between 0 and 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_thresholds() {
        let config = PipelineConfig::default();
        assert_eq!(config.gating.identity_booster_min_text_length, 80);
        assert_eq!(config.gating.identity_booster_max_locked_spans, 1);
        assert_eq!(config.gating.situation_analysis_min_text_length, 600);
        assert_eq!(config.retry_count, 1);
        assert_eq!(config.wall_clock_seconds, 120);
    }

    #[test]
    fn rejects_zero_wall_clock() {
        let mut config = PipelineConfig::default();
        config.wall_clock_seconds = 0;
        assert!(config.validate().is_err());
    }
}
