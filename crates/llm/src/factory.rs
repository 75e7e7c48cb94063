//! Builds the shared `LLMClient` from `tone-config`'s settings.
//!
//! There is exactly one provider in this deployment (Anthropic), but the
//! factory indirection is kept — grounded on the teacher's
//! `LlmFactory`/`LlmProviderConfig` dispatch shape — so a second
//! provider can be added without touching call sites in `tone-pipeline`.

use std::sync::Arc;

use tone_core::error::{Error, Result};
use tone_core::traits::LLMClient;

use crate::claude::{ClaudeClient, ClaudeConfig};

#[derive(Debug, Clone)]
pub enum LlmProvider {
    Anthropic,
}

#[derive(Debug, Clone)]
pub struct LlmProviderConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
}

pub fn build_client(config: &LlmProviderConfig) -> Result<Arc<dyn LLMClient>> {
    match config.provider {
        LlmProvider::Anthropic => {
            let claude_config = ClaudeConfig {
                api_key: config.api_key.clone(),
                endpoint: config.endpoint.clone(),
                ..ClaudeConfig::default()
            };
            let client = ClaudeClient::new(claude_config, &config.model)
                .map_err(|e| Error::Configuration(e.to_string()))?;
            Ok(Arc::new(client))
        }
    }
}
