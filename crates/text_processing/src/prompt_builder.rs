//! Final-Prompt Builder (§4.13): assembles the system + user prompt
//! pair handed to the Streaming Generator out of the selected
//! template, the surviving (non-RED) segments, and whatever facts the
//! Situation Analyzer returned.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use tone_core::fact::Fact;
use tone_core::request::{RewriteRequest, Tone};
use tone_core::segment::{LabeledSegment, Tier};
use tone_core::span::LockedSpan;
use tone_core::template::SelectedTemplate;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([A-Z]+)_(\d+)\}\}").unwrap());
static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s\p{P}]+").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMeta {
    pub persona: String,
    pub contexts: Vec<String>,
    pub tone: Tone,
    pub sender_name: Option<String>,
    pub template_id: String,
    pub section_order: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSegment {
    pub id: String,
    pub order: usize,
    pub tier: Tier,
    pub label: String,
    /// `None` for RED segments — the generator never sees their text.
    pub text: Option<String>,
    pub dedupe_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must_include: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptEnvelope {
    pub system_prompt: String,
    pub meta: PromptMeta,
    pub segments: Vec<PromptSegment>,
    pub facts: Vec<Fact>,
    pub placeholders: Vec<(String, String)>,
    /// Every placeholder that appeared in a YELLOW segment — §4.16 rule 11.
    pub must_include: Vec<String>,
    /// Marker -> original RED segment text, held server-side for the
    /// Output Validator's anti-leak check. Never serialized into the
    /// wire JSON the generator receives (see `to_user_message`).
    pub redaction_map: HashMap<String, String>,
}

fn dedupe_key(text: &str) -> String {
    let with_type_tokens = PLACEHOLDER.replace_all(text, |caps: &regex::Captures| {
        format!("{}_{}", caps[1].to_lowercase(), &caps[2])
    });
    PUNCTUATION.replace_all(&with_type_tokens, "").to_lowercase()
}

fn fact_dedupe_key(fact: &Fact) -> String {
    fact.content.trim().to_lowercase()
}

fn placeholders_in(text: &str) -> Vec<String> {
    PLACEHOLDER.find_iter(text).map(|m| m.as_str().to_string()).collect()
}

const SYSTEM_PROMPT_HEADER: &str = "\
You rewrite Korean business messages into polished, professional prose. \
Segments are tagged GREEN, YELLOW, or RED:
- GREEN: rephrase while preserving every fact, number, and placeholder exactly.
- YELLOW: apply a three-phase cushion -> fact -> direction rewrite; soften tone, keep substance.
- RED: the original text has already been removed. Do not reconstruct, paraphrase, or imply its content.
Never mention that you are an AI or that this text was rewritten. Never use emoji. \
Reproduce every {{TYPE_N}} placeholder exactly as given, verbatim, at least once.";

/// Builds the system + user prompt pair. `segments` is the full,
/// pre-redaction segment list (GREEN, YELLOW, and RED); `order` is each
/// segment's start-position rank across that full list, and RED
/// segments still get a row in `segments` — with `text`/`dedupe_key`
/// null — so the gaps they leave are visible, they just carry no text.
pub fn build(
    request: &RewriteRequest,
    template: SelectedTemplate,
    segments: Vec<LabeledSegment>,
    facts: Vec<Fact>,
    locked_spans: &[LockedSpan],
    redaction_map: HashMap<String, String>,
) -> PromptEnvelope {
    let mut seen_facts = HashSet::new();
    let facts: Vec<Fact> = facts
        .into_iter()
        .filter(|f| seen_facts.insert(fact_dedupe_key(f)))
        .collect();

    let mut ordered = segments;
    ordered.sort_by_key(|s| s.segment.start);

    let mut must_include: Vec<String> = Vec::new();
    let prompt_segments: Vec<PromptSegment> = ordered
        .into_iter()
        .enumerate()
        .map(|(order, s)| {
            let tier = s.tier();
            if tier == Tier::Red {
                return PromptSegment {
                    id: s.segment.id,
                    order,
                    tier,
                    label: format!("{:?}", s.label),
                    text: None,
                    dedupe_key: None,
                    must_include: Vec::new(),
                };
            }
            let text = s.segment.text.clone();
            if tier == Tier::Yellow {
                must_include.extend(placeholders_in(&text));
            }
            PromptSegment {
                id: s.segment.id,
                order,
                tier,
                label: format!("{:?}", s.label),
                dedupe_key: Some(dedupe_key(&text)),
                text: Some(text),
                must_include: Vec::new(),
            }
        })
        .collect();
    must_include.sort();
    must_include.dedup();

    let placeholders = locked_spans
        .iter()
        .map(|s| (s.placeholder.clone(), s.original_text.clone()))
        .collect();

    let section_order = template
        .effective_sections
        .iter()
        .map(|s| s.key.as_str().to_string())
        .collect();

    PromptEnvelope {
        system_prompt: build_system_prompt(&template),
        meta: PromptMeta {
            persona: format!("{:?}", request.persona),
            contexts: request.contexts.iter().map(|c| format!("{c:?}")).collect(),
            tone: request.tone,
            sender_name: request.sender.as_ref().and_then(|s| s.name.clone()),
            template_id: template.id.clone(),
            section_order,
        },
        segments: prompt_segments,
        facts,
        placeholders,
        must_include,
        redaction_map,
    }
}

fn build_system_prompt(template: &SelectedTemplate) -> String {
    let mut prompt = String::from(SYSTEM_PROMPT_HEADER);
    prompt.push_str("\n\nStructure the reply using these sections, in order: ");
    let names: Vec<&str> = template.effective_sections.iter().map(|s| s.key.as_str()).collect();
    prompt.push_str(&names.join(", "));
    prompt.push('.');
    prompt
}

/// Renders the envelope's `meta`/`segments`/`placeholders` fields as
/// the JSON user message the generator receives (§4.13).
pub fn to_user_message(envelope: &PromptEnvelope) -> String {
    #[derive(Serialize)]
    struct UserMessage<'a> {
        meta: &'a PromptMeta,
        segments: &'a [PromptSegment],
        facts: &'a [Fact],
        placeholders: &'a [(String, String)],
    }
    serde_json::to_string_pretty(&UserMessage {
        meta: &envelope.meta,
        segments: &envelope.segments,
        facts: &envelope.facts,
        placeholders: &envelope.placeholders,
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tone_core::request::{Context, Persona};
    use tone_core::segment::{Label, Segment};
    use tone_core::span::SpanType;
    use tone_core::template::{EffectiveSection, SectionKey};
    use uuid::Uuid;

    fn sample_request() -> RewriteRequest {
        RewriteRequest {
            persona: Persona::Boss,
            contexts: vec![Context::Request],
            tone: Tone::Polite,
            sender: None,
            hint: None,
            text: "확인 부탁드립니다".into(),
            identity_boost: None,
            request_id: Uuid::nil(),
        }
    }

    fn sample_template() -> SelectedTemplate {
        SelectedTemplate {
            id: "T02_REQUEST".into(),
            name: "Request".into(),
            effective_sections: vec![EffectiveSection {
                key: SectionKey::S5Request,
                expand: false,
                shorten: false,
            }],
        }
    }

    fn labeled(text: &str, start: usize, label: Label) -> LabeledSegment {
        LabeledSegment {
            segment: Segment {
                id: format!("seg_{start}"),
                text: text.into(),
                start,
                end: start + text.len(),
            },
            label,
        }
    }

    #[test]
    fn dedupes_facts_with_identical_content() {
        let facts = vec![
            Fact { content: "요청일 6월 1일".into(), source: "a".into() },
            Fact { content: "요청일 6월 1일".into(), source: "b".into() },
        ];
        let envelope = build(&sample_request(), sample_template(), vec![], facts, &[], HashMap::new());
        assert_eq!(envelope.facts.len(), 1);
    }

    #[test]
    fn must_include_only_carries_yellow_placeholders() {
        let span = LockedSpan::new(0, "010-1234-5678", SpanType::Phone, 0, 13);
        let segments = vec![
            labeled("연락처는 {{PHONE_0}}입니다", 0, Label::Accountability),
            labeled("확인 부탁드립니다", 30, Label::Request),
        ];
        let envelope = build(
            &sample_request(),
            sample_template(),
            segments,
            vec![],
            std::slice::from_ref(&span),
            HashMap::new(),
        );
        assert_eq!(envelope.must_include, vec!["{{PHONE_0}}".to_string()]);
    }

    #[test]
    fn segments_are_ordered_by_start_position() {
        let segments = vec![
            labeled("두번째", 10, Label::Request),
            labeled("첫번째", 0, Label::CoreFact),
        ];
        let envelope = build(&sample_request(), sample_template(), segments, vec![], &[], HashMap::new());
        assert_eq!(envelope.segments[0].order, 0);
        assert!(envelope.segments[0].text.as_deref() == Some("첫번째"));
    }

    #[test]
    fn red_segment_keeps_its_order_with_null_text() {
        let mut redaction_map = HashMap::new();
        redaction_map.insert("[REDACTED:AGGRESSION_0]".to_string(), "폭언".to_string());
        let segments = vec![
            labeled("첫번째", 0, Label::CoreFact),
            labeled("폭언", 10, Label::Aggression),
            labeled("세번째", 20, Label::Request),
        ];
        let envelope = build(&sample_request(), sample_template(), segments, vec![], &[], redaction_map.clone());
        assert_eq!(envelope.segments.len(), 3);
        let red = &envelope.segments[1];
        assert_eq!(red.order, 1);
        assert_eq!(red.tier, Tier::Red);
        assert!(red.text.is_none());
        assert!(red.dedupe_key.is_none());
        assert_eq!(envelope.redaction_map, redaction_map);
    }

    #[test]
    fn dedupe_key_normalizes_placeholders_and_punctuation() {
        let a = dedupe_key("금요일까지 보고서 부탁드립니다. {{FILE_0}}");
        let b = dedupe_key("금요일까지  보고서 부탁드립니다 {{FILE_0}}!!");
        assert_eq!(a, b);
    }
}
