//! Situation Analyzer (§4.9, parallel gated LLM): extracts structured
//! facts and intent from masked text. Parses strict JSON; malformed
//! output is a `GatingLLMFailure` (§7) — logged and treated as an
//! empty result, never an error. The RED-overlap filter runs
//! separately once labeling completes (`filter_red_overlap` below).

use std::collections::HashSet;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use tone_config::StageModelConfig;
use tone_core::fact::{Fact, SituationAnalysis};
use tone_core::llm_types::{GenerateRequest, Message};
use tone_core::segment::{LabeledSegment, Tier};
use tone_core::traits::LLMClient;

pub fn should_fire(masked_text: &str, min_text_length: usize, min_transition_words: usize) -> bool {
    const TRANSITIONS: &[&str] = &[
        "그리고", "그런데", "하지만", "따라서", "그래서", "또한", "게다가", "반면에", "한편", "그러나",
    ];
    let transition_count: usize = TRANSITIONS.iter().map(|w| masked_text.matches(*w).count()).sum();
    masked_text.chars().count() >= min_text_length || transition_count >= min_transition_words
}

#[derive(Deserialize)]
struct RawAnalysis {
    facts: Vec<RawFact>,
    intent: String,
}

#[derive(Deserialize)]
struct RawFact {
    content: String,
    source: String,
}

pub async fn analyze(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    masked_text: &str,
    cancel: CancellationToken,
) -> SituationAnalysis {
    let system = "Extract the key facts and the sender's intent from this masked Korean business message. \
Reply with strict JSON only, shaped as {\"facts\": [{\"content\": string, \"source\": string}], \"intent\": string}. \
Each fact's `source` must be a verbatim substring of the input (it may contain {{TYPE_N}} placeholders).";
    let request = GenerateRequest {
        messages: vec![Message::system(system), Message::user(masked_text.to_string())],
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let outcome = tokio::select! {
        _ = cancel.cancelled() => {
            warn!("situation analyzer cancelled, using empty result");
            return SituationAnalysis::default();
        }
        result = llm.complete(request) => result,
    };

    match outcome {
        Ok(response) => match parse_strict_json(&response.text) {
            Some(raw) => SituationAnalysis {
                facts: raw.facts.into_iter().map(|f| Fact { content: f.content, source: f.source }).collect(),
                intent: raw.intent,
                prompt_tokens: response.usage.prompt_tokens,
                completion_tokens: response.usage.completion_tokens,
            },
            None => {
                warn!("situation analyzer returned malformed json, using empty result");
                SituationAnalysis::default()
            }
        },
        Err(e) => {
            warn!("situation analyzer call failed, using empty result: {e}");
            SituationAnalysis::default()
        }
    }
}

fn parse_strict_json(text: &str) -> Option<RawAnalysis> {
    let trimmed = text.trim();
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    serde_json::from_str(&trimmed[start..=end]).ok()
}

const STOP_WORDS: &[&str] = &["그리고", "그런데", "하지만", "이것", "저것", "합니다", "입니다"];

fn meaningful_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && !is_hangul(c))
        .filter(|w| w.chars().count() >= 2 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn is_hangul(c: char) -> bool {
    matches!(c as u32, 0xAC00..=0xD7A3)
}

fn normalize_for_contains(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric() || is_hangul(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Three-tier match against RED segments: exact substring, then
/// normalized-contains, then >=2 meaningful-word overlap. Drops the
/// fact if any tier matches (§4.9).
pub fn filter_red_overlap(
    facts: Vec<Fact>,
    masked_text: &str,
    labeled: &[LabeledSegment],
) -> Vec<Fact> {
    let red_segments: Vec<&LabeledSegment> = labeled.iter().filter(|s| s.tier() == Tier::Red).collect();
    if red_segments.is_empty() {
        return facts;
    }

    facts
        .into_iter()
        .filter(|fact| {
            let exact_overlap = masked_text.find(&fact.source).map(|idx| {
                let end = idx + fact.source.len();
                red_segments.iter().any(|s| idx < s.segment.end && end > s.segment.start)
            });
            if exact_overlap == Some(true) {
                return false;
            }

            let normalized_source = normalize_for_contains(&fact.source);
            if !normalized_source.is_empty()
                && red_segments
                    .iter()
                    .any(|s| normalize_for_contains(&s.segment.text).contains(&normalized_source))
            {
                return false;
            }

            let fact_words = meaningful_words(&fact.source);
            let word_overlap = red_segments.iter().any(|s| {
                let seg_words = meaningful_words(&s.segment.text);
                fact_words.intersection(&seg_words).count() >= 2
            });
            !word_overlap
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tone_core::segment::{Label, Segment};

    #[test]
    fn parses_strict_json_ignoring_surrounding_text() {
        let text = "Here you go:\n{\"facts\": [{\"content\": \"a\", \"source\": \"b\"}], \"intent\": \"request\"}\nthanks";
        let parsed = parse_strict_json(text).unwrap();
        assert_eq!(parsed.intent, "request");
        assert_eq!(parsed.facts.len(), 1);
    }

    #[test]
    fn malformed_json_returns_none() {
        assert!(parse_strict_json("not json at all").is_none());
    }

    #[test]
    fn drops_fact_overlapping_red_segment_exactly() {
        let masked = "이 무능한 담당자야 환불해줘";
        let labeled = vec![LabeledSegment {
            segment: Segment { id: "T1".into(), text: "이 무능한 담당자야".into(), start: 0, end: 15 },
            label: Label::PersonalAttack,
        }];
        let facts = vec![Fact { content: "불만 제기".into(), source: "이 무능한 담당자야".into() }];
        let filtered = filter_red_overlap(facts, masked, &labeled);
        assert!(filtered.is_empty());
    }

    #[test]
    fn keeps_fact_with_no_red_overlap() {
        let masked = "이 무능한 담당자야 환불해줘";
        let labeled = vec![LabeledSegment {
            segment: Segment { id: "T1".into(), text: "이 무능한 담당자야".into(), start: 0, end: 15 },
            label: Label::PersonalAttack,
        }];
        let facts = vec![Fact { content: "환불 요청".into(), source: "환불해줘".into() }];
        let filtered = filter_red_overlap(facts, masked, &labeled);
        assert_eq!(filtered.len(), 1);
    }
}
