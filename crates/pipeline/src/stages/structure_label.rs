//! Structure Labeler (§4.7, LLM #1): assigns one of ~14 labels to each
//! segment. Internally retries once on low coverage or a missing
//! core-tier label; a failure here (not the retry, the whole stage)
//! is fatal per §7's `StructureLabelerFailure`.

use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use tone_config::StageModelConfig;
use tone_core::llm_types::{GenerateRequest, Message, Role, TokenUsage};
use tone_core::segment::{Label, LabeledSegment, Segment};
use tone_core::traits::LLMClient;

use crate::error::PipelineError;

static LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^((?:T\d+|seg_\d+)(?:_\d+)*)\s*\|\s*([A-Z_]+)\s*\|\s*(.*)$").unwrap());
static SUMMARY_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^SUMMARY:\s*(.+)$").unwrap());

pub struct LabelResult {
    pub labeled: Vec<LabeledSegment>,
    pub summary: Option<String>,
    pub usage: TokenUsage,
}

fn build_prompt(masked_text: &str, segments: &[Segment], retry_hint: Option<&str>) -> (String, String) {
    let system = "You label each numbered segment of a Korean business message with exactly one tag: \
CORE_FACT, CORE_INTENT, REQUEST, APOLOGY, COURTESY, ACCOUNTABILITY, SELF_JUSTIFICATION, NEGATIVE_FEEDBACK, \
EMOTIONAL, EXCESS_DETAIL, SPECULATION, BLAME, AGGRESSION, PERSONAL_ATTACK, PRIVATE_TMI, GRUMBLE, or SELF_DEFENSE. \
Reply with one line per segment in the form `<id>|<LABEL>|<exact substring>`, then optionally a final \
`SUMMARY: <one or two sentence core intent>` line.".to_string();

    let mut user = String::from("Segments:\n");
    for s in segments {
        user.push_str(&format!("{}: {}\n", s.id, s.text));
    }
    user.push_str("\nFull masked text:\n");
    user.push_str(masked_text);
    if let Some(hint) = retry_hint {
        user.push_str("\n\n");
        user.push_str(hint);
    }
    (system, user)
}

fn parse_response(text: &str, segments: &[Segment]) -> (Vec<LabeledSegment>, Option<String>) {
    let mut labeled = Vec::new();
    let mut summary = None;
    for line in text.lines() {
        let line = line.trim();
        if let Some(caps) = SUMMARY_LINE.captures(line) {
            summary = Some(caps[1].trim().to_string());
            continue;
        }
        let Some(caps) = LINE.captures(line) else { continue };
        let seg_id = &caps[1];
        let Some(label) = Label::parse(&caps[2]) else { continue };
        let Some(segment) = segments.iter().find(|s| s.id == seg_id) else { continue };
        let exact = caps[3].trim();
        let text = if exact.is_empty() { segment.text.clone() } else { exact.to_string() };
        labeled.push(LabeledSegment {
            segment: Segment {
                id: segment.id.clone(),
                text,
                start: segment.start,
                end: segment.end,
            },
            label,
        });
    }
    (labeled, summary)
}

fn coverage(labeled: &[LabeledSegment], masked_text: &str) -> f32 {
    if masked_text.is_empty() {
        return 1.0;
    }
    let labeled_len: usize = labeled.iter().map(|s| s.segment.text.chars().count()).sum();
    labeled_len as f32 / masked_text.chars().count() as f32
}

fn has_core_label(labeled: &[LabeledSegment]) -> bool {
    labeled
        .iter()
        .any(|s| matches!(s.label, Label::CoreFact | Label::CoreIntent))
}

fn is_acceptable(labeled: &[LabeledSegment], masked_text: &str, coverage_threshold: f32) -> bool {
    coverage(labeled, masked_text) >= coverage_threshold && has_core_label(labeled)
}

async fn call(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    masked_text: &str,
    segments: &[Segment],
    retry_hint: Option<&str>,
    cancel: &CancellationToken,
) -> Result<(Vec<LabeledSegment>, Option<String>, TokenUsage), PipelineError> {
    let (system, user) = build_prompt(masked_text, segments, retry_hint);
    let request = GenerateRequest {
        messages: vec![Message { role: Role::System, content: system }, Message::user(user)],
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        result = llm.complete(request) => result.map_err(|e| PipelineError::StructureLabelerFailure(e.to_string()))?,
    };
    let (labeled, summary) = parse_response(&response.text, segments);
    Ok((labeled, summary, response.usage))
}

/// Runs the labeler, retrying once (§4.7) if coverage or core-label
/// presence fails; accepts the retry's result unconditionally.
pub async fn label(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    masked_text: &str,
    segments: &[Segment],
    coverage_threshold: f32,
    cancel: CancellationToken,
) -> Result<LabelResult, PipelineError> {
    let (labeled, summary, mut usage) = call(llm, config, masked_text, segments, None, &cancel).await?;

    if is_acceptable(&labeled, masked_text, coverage_threshold) {
        return Ok(LabelResult { labeled, summary, usage });
    }

    warn!("structure labeler failed coverage/core-label check, retrying once");
    let hint = "Your previous labeling did not cover enough of the text or was missing a CORE_FACT/CORE_INTENT \
segment. Label every segment again, covering the full text.";
    let (labeled, summary, retry_usage) = call(llm, config, masked_text, segments, Some(hint), &cancel).await?;
    usage.prompt_tokens += retry_usage.prompt_tokens;
    usage.completion_tokens += retry_usage.completion_tokens;
    Ok(LabelResult { labeled, summary, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs() -> Vec<Segment> {
        vec![
            Segment { id: "T1".into(), text: "확인 부탁드립니다.".into(), start: 0, end: 10 },
            Segment { id: "T2".into(), text: "감사합니다.".into(), start: 10, end: 16 },
        ]
    }

    #[test]
    fn parses_label_lines_and_summary() {
        let response = "T1|REQUEST|확인 부탁드립니다\nT2|COURTESY|감사합니다\nSUMMARY: 확인을 요청함";
        let (labeled, summary) = parse_response(response, &segs());
        assert_eq!(labeled.len(), 2);
        assert_eq!(labeled[0].label, Label::Request);
        assert_eq!(summary.as_deref(), Some("확인을 요청함"));
    }

    #[test]
    fn falls_back_to_segment_text_when_substring_empty() {
        let response = "T1|CORE_FACT|";
        let (labeled, _) = parse_response(response, &segs());
        assert_eq!(labeled[0].segment.text, "확인 부탁드립니다.");
    }

    #[test]
    fn parses_refined_sub_segment_ids() {
        let segments = vec![Segment { id: "T1_0".into(), text: "확인 부탁드립니다.".into(), start: 0, end: 10 }];
        let response = "T1_0|REQUEST|확인 부탁드립니다";
        let (labeled, _) = parse_response(response, &segments);
        assert_eq!(labeled.len(), 1);
        assert_eq!(labeled[0].segment.id, "T1_0");
    }

    #[test]
    fn coverage_below_threshold_is_rejected() {
        let labeled = vec![LabeledSegment {
            segment: Segment { id: "T1".into(), text: "a".into(), start: 0, end: 1 },
            label: Label::Request,
        }];
        assert!(!is_acceptable(&labeled, "a very long masked text indeed", 0.6));
    }
}
