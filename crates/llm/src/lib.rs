//! The one outbound LLM integration the pipeline calls through: the
//! Anthropic Messages API, wrapped behind `tone_core::LLMClient` so
//! `tone-pipeline` never depends on a concrete provider.

pub mod claude;
pub mod factory;

pub use claude::{ClaudeClient, ClaudeConfig};
pub use factory::{build_client, LlmProvider, LlmProviderConfig};
