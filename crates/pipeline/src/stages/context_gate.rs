//! Context Gating (§4.11, gated LLM): asks the model whether the
//! template picked by the rule-based selector actually fits, and lets
//! it override the selection when confident enough. A `GatingLLMFailure`
//! (§7) leaves the original template selection untouched.

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use tone_config::StageModelConfig;
use tone_core::llm_types::{GenerateRequest, Message, TokenUsage};
use tone_core::request::{Context, Persona};
use tone_core::segment::LabelStats;
use tone_core::template::SelectedTemplate;
use tone_core::traits::LLMClient;
use tone_text::template_selector::select;

pub struct GateResult {
    pub template: SelectedTemplate,
    pub overridden: bool,
    pub usage: TokenUsage,
}

#[derive(Deserialize)]
struct RawDecision {
    #[serde(rename = "shouldOverride")]
    should_override: bool,
    confidence: f32,
    #[serde(rename = "inferredContext")]
    inferred_context: Option<String>,
}

fn parse_context(raw: &str) -> Option<Context> {
    match raw {
        "REQUEST" => Some(Context::Request),
        "APOLOGY" => Some(Context::Apology),
        "REJECTION" => Some(Context::Rejection),
        "COMPLAINT" => Some(Context::Complaint),
        "FOLLOW_UP" => Some(Context::FollowUp),
        "INTRODUCTION" => Some(Context::Introduction),
        "NOTICE" => Some(Context::Notice),
        "GRATITUDE" => Some(Context::Gratitude),
        "WARNING_PREVENTION" => Some(Context::WarningPrevention),
        "OTHER" => Some(Context::Other),
        _ => None,
    }
}

fn parse_strict_json(text: &str) -> Option<RawDecision> {
    let trimmed = text.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// §4.11 gate: a mismatch between caller-supplied metadata and the text
/// can only exist if the caller actually supplied context metadata to
/// mismatch against.
pub fn should_fire(contexts: &[Context]) -> bool {
    !contexts.is_empty()
}

/// Runs the optional context-gating call and re-selects the template if
/// it overrides with confidence at or above `override_confidence_threshold`.
pub async fn gate(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    masked_text: &str,
    persona: Persona,
    stats: &LabelStats,
    current: SelectedTemplate,
    override_confidence_threshold: f32,
    cancel: CancellationToken,
) -> GateResult {
    let system = "Decide whether the selected template truly fits this masked Korean business message. \
Reply with strict JSON only, shaped as {\"shouldOverride\": bool, \"confidence\": number (0-1), \
\"inferredContext\": string one of REQUEST/APOLOGY/REJECTION/COMPLAINT/FOLLOW_UP/INTRODUCTION/NOTICE/GRATITUDE/WARNING_PREVENTION/OTHER}.";
    let user = format!(
        "Selected template: {}\n\nMasked text:\n{}",
        current.id, masked_text
    );
    let request = GenerateRequest {
        messages: vec![Message::system(system), Message::user(user)],
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            warn!("context gating cancelled, keeping current template");
            return GateResult { template: current, overridden: false, usage: TokenUsage::default() };
        }
        result = llm.complete(request) => result,
    };

    match outcome {
        Ok(response) => match parse_strict_json(&response.text) {
            Some(decision) if decision.should_override && decision.confidence >= override_confidence_threshold => {
                match decision.inferred_context.as_deref().and_then(parse_context) {
                    Some(inferred) => {
                        let template = select(&[inferred], persona, masked_text, stats);
                        GateResult { template, overridden: true, usage: response.usage }
                    }
                    None => GateResult { template: current, overridden: false, usage: response.usage },
                }
            }
            Some(_) => GateResult { template: current, overridden: false, usage: response.usage },
            None => {
                warn!("context gating returned malformed json, keeping current template");
                GateResult { template: current, overridden: false, usage: TokenUsage::default() }
            }
        },
        Err(e) => {
            warn!("context gating call failed, keeping current template: {e}");
            GateResult { template: current, overridden: false, usage: TokenUsage::default() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decision_json() {
        let text = "{\"shouldOverride\": true, \"confidence\": 0.9, \"inferredContext\": \"APOLOGY\"}";
        let decision = parse_strict_json(text).unwrap();
        assert!(decision.should_override);
        assert_eq!(decision.confidence, 0.9);
        assert_eq!(parse_context(decision.inferred_context.as_deref().unwrap()), Some(Context::Apology));
    }

    #[test]
    fn unknown_context_string_is_none() {
        assert_eq!(parse_context("NOT_A_CONTEXT"), None);
    }

    #[test]
    fn does_not_fire_without_caller_supplied_contexts() {
        assert!(!should_fire(&[]));
        assert!(should_fire(&[Context::Request]));
    }
}
