//! Segment Refiner (§4.6, gated LLM): splits over-long segments that
//! survived the rule-based segmenter's force-split pass. A failure here
//! is a `GatingLLMFailure` (§7) — the segments are left unchanged.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use tone_config::StageModelConfig;
use tone_core::llm_types::{GenerateRequest, Message, TokenUsage};
use tone_core::segment::Segment;
use tone_core::traits::LLMClient;

pub fn should_fire(segments: &[Segment], trigger_chars: usize) -> bool {
    segments.iter().any(|s| s.text.chars().count() > trigger_chars)
}

/// Splits each oversized segment via one LLM call that returns one
/// sub-segment per line, keeping relative order; other segments pass
/// through untouched. Returns the original segments unchanged on any
/// LLM failure.
pub async fn refine(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    segments: Vec<Segment>,
    trigger_chars: usize,
    cancel: CancellationToken,
) -> (Vec<Segment>, TokenUsage) {
    let mut usage = TokenUsage::default();
    let mut out = Vec::with_capacity(segments.len());

    for segment in segments {
        if cancel.is_cancelled() {
            warn!("segment refiner cancelled mid-pass, leaving remaining segments unchanged");
            out.push(segment);
            continue;
        }
        if segment.text.chars().count() <= trigger_chars {
            out.push(segment);
            continue;
        }
        match split_one(llm, config, &segment, &cancel).await {
            Ok((pieces, piece_usage)) => {
                usage.prompt_tokens += piece_usage.prompt_tokens;
                usage.completion_tokens += piece_usage.completion_tokens;
                out.extend(pieces);
            }
            Err(e) => {
                warn!("segment refiner call failed, leaving segment unchanged: {e}");
                out.push(segment);
            }
        }
    }
    (out, usage)
}

async fn split_one(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    segment: &Segment,
    cancel: &CancellationToken,
) -> Result<(Vec<Segment>, TokenUsage), tone_core::Error> {
    let system = "Split the given text into shorter sub-segments at natural meaning boundaries. \
Reply with one sub-segment per line, in order, with no other commentary. Never split inside a {{TYPE_N}} placeholder."
        .to_string();
    let request = GenerateRequest {
        messages: vec![Message::system(system), Message::user(segment.text.clone())],
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };
    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(tone_core::Error::Cancelled),
        result = llm.complete(request) => result?,
    };

    let mut pieces = Vec::new();
    let mut cursor = segment.start;
    for line in response.text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(rel) = segment.text[cursor.saturating_sub(segment.start).min(segment.text.len())..].find(line) else {
            continue;
        };
        let start = cursor + rel;
        let end = start + line.len();
        pieces.push(Segment {
            id: format!("{}_{}", segment.id, pieces.len()),
            text: line.to_string(),
            start,
            end,
        });
        cursor = end;
    }
    if pieces.is_empty() {
        pieces.push(segment.clone());
    }
    Ok((pieces, response.usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_when_any_segment_exceeds_threshold() {
        let segments = vec![Segment { id: "T1".into(), text: "a".repeat(200), start: 0, end: 200 }];
        assert!(should_fire(&segments, 150));
    }

    #[test]
    fn does_not_fire_when_all_segments_short() {
        let segments = vec![Segment { id: "T1".into(), text: "짧은 문장".into(), start: 0, end: 10 }];
        assert!(!should_fire(&segments, 150));
    }
}
