//! Identity-Lock Booster (§4.4, gated LLM): asks the model for
//! proper-noun lines, then hands them to `tone_text::identity_booster`
//! for the deterministic occurrence search, merge, and re-index. Any
//! LLM failure here is a `GatingLLMFailure` (§7): return the input
//! unchanged with zero token usage.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use tone_config::StageModelConfig;
use tone_core::llm_types::{GenerateRequest, Message, TokenUsage};
use tone_core::request::Persona;
use tone_core::span::LockedSpan;
use tone_core::traits::LLMClient;
use tone_text::identity_booster::{merge_candidate_names, should_fire};
use tone_text::locked_span::mask;

pub struct BoostResult {
    pub remasked_text: String,
    pub all_spans: Vec<LockedSpan>,
    pub usage: TokenUsage,
}

#[allow(clippy::too_many_arguments)]
pub async fn boost(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    caller_toggle: Option<bool>,
    persona: Persona,
    normalized_text: &str,
    masked_text: &str,
    existing_spans: Vec<LockedSpan>,
    min_text_length: usize,
    max_existing_locked_spans: usize,
    cancel: CancellationToken,
) -> BoostResult {
    if !should_fire(
        caller_toggle,
        persona,
        existing_spans.len(),
        normalized_text.chars().count(),
        min_text_length,
        max_existing_locked_spans,
    ) {
        return BoostResult {
            remasked_text: masked_text.to_string(),
            all_spans: existing_spans,
            usage: TokenUsage::default(),
        };
    }

    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            warn!("identity-lock booster cancelled, leaving spans unchanged");
            return BoostResult {
                remasked_text: masked_text.to_string(),
                all_spans: existing_spans,
                usage: TokenUsage::default(),
            };
        }
        result = ask_for_names(llm, config, normalized_text) => result,
    };

    match outcome {
        Ok((candidates, usage)) => {
            let all_spans = merge_candidate_names(normalized_text, &candidates, &existing_spans);
            let remasked_text = mask(normalized_text, &all_spans);
            BoostResult { remasked_text, all_spans, usage }
        }
        Err(e) => {
            warn!("identity-lock booster call failed, leaving spans unchanged: {e}");
            BoostResult {
                remasked_text: masked_text.to_string(),
                all_spans: existing_spans,
                usage: TokenUsage::default(),
            }
        }
    }
}

async fn ask_for_names(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    normalized_text: &str,
) -> Result<(Vec<String>, TokenUsage), tone_core::Error> {
    let system = "List every proper noun referring to a specific person, company, or organization \
in the given Korean text — one per line, exact substrings only, no commentary.";
    let request = GenerateRequest {
        messages: vec![Message::system(system), Message::user(normalized_text.to_string())],
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let response = llm.complete(request).await?;
    let candidates = response
        .text
        .lines()
        .map(|l| l.trim().trim_start_matches(['-', '*']).trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    Ok((candidates, response.usage))
}
