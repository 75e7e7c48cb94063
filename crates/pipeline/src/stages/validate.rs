//! Output Validator (§4.16): runs the fixed list of invariant checks
//! against one generation's unmasked output and classifies each finding
//! ERROR or WARNING. `passed()` is no-ERROR; a retry is issued on any
//! ERROR or any retryable WARNING.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use tone_core::request::Persona;
use tone_core::segment::{LabeledSegment, Tier};
use tone_core::span::LockedSpan;
use tone_core::template::SelectedTemplate;
use tone_core::validation::{ValidationIssue, ValidationReport, ValidationRule};

static META_NARRATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)as an ai|저는 ai|인공지능|here is the rewritten|rewritten (text|message)|다시 작성(했습니다|한)").unwrap()
});
static LEAKED_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[REDACTED:[^\]]*\]|\[SOFTEN:[^\]]*\]").unwrap());
static REPEATED_ENDING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(드리겠습니다)(\s*\1){2,}").unwrap());
static EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{1F300}-\u{1FAFF}\u{2600}-\u{27BF}]").unwrap()
});
static NUMERIC_OR_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{4}[-./]\d{1,2}[-./]\d{1,2}|\d+(,\d{3})*(\.\d+)?").unwrap()
});

fn sentences(text: &str) -> Vec<&str> {
    text.split(|c| c == '.' || c == '!' || c == '?' || c == '\n')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect()
}

fn meaningful_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(|w| w.to_string())
        .collect()
}

fn bag_of_words_similarity(a: &str, b: &str) -> f32 {
    let wa = meaningful_words(a);
    let wb = meaningful_words(b);
    if wa.is_empty() {
        return 1.0;
    }
    let overlap = wa.intersection(&wb).count();
    overlap as f32 / wa.len() as f32
}

pub struct ValidationInput<'a> {
    pub unmasked_text: &'a str,
    pub raw_content: &'a str,
    pub normalized_text: &'a str,
    pub locked_spans: &'a [LockedSpan],
    pub redacted_originals: &'a [String],
    pub yellow_segments: &'a [LabeledSegment],
    pub template: &'a SelectedTemplate,
    #[allow(dead_code)]
    pub persona: Persona,
    pub must_include: &'a [String],
}

const YELLOW_SIMILARITY_THRESHOLD: f32 = 0.3;
const LENGTH_RATIO_MIN: f32 = 0.4;
const LENGTH_RATIO_MAX: f32 = 2.5;

pub fn validate(input: &ValidationInput) -> ValidationReport {
    let mut issues = Vec::new();

    // Rule 1: every placeholder present in raw content; every span's
    // original text present in unmasked output.
    for span in input.locked_spans {
        if !input.raw_content.contains(&span.placeholder) {
            issues.push(
                ValidationIssue::error(
                    ValidationRule::MissingPlaceholder,
                    format!("placeholder {} missing from llm output", span.placeholder),
                )
                .with_match(span.placeholder.clone()),
            );
        }
        if !input.unmasked_text.contains(&span.original_text) {
            issues.push(ValidationIssue::error(
                ValidationRule::MissingPlaceholder,
                format!("locked span text for {} missing from unmasked output", span.placeholder),
            ));
        }
    }

    // Rule 2: no leaked redaction marker.
    if let Some(m) = LEAKED_MARKER.find(input.unmasked_text) {
        issues.push(
            ValidationIssue::error(ValidationRule::RedContentLeaked, "leaked redaction marker in output")
                .with_match(m.as_str()),
        );
    }

    // Rule 3: no meta narration.
    if let Some(m) = META_NARRATION.find(input.unmasked_text) {
        issues.push(
            ValidationIssue::error(ValidationRule::BannedPhrase, "meta narration in output").with_match(m.as_str()),
        );
    }

    // Rule 4: no repeated ending >=3x in a row.
    if REPEATED_ENDING.is_match(input.unmasked_text) {
        issues.push(ValidationIssue::warning(ValidationRule::RepeatedSentence, "ending phrase repeated 3+ times"));
    }

    // Rule 5: no emoji.
    if EMOJI.is_match(input.unmasked_text) {
        issues.push(ValidationIssue::warning(ValidationRule::BannedPhrase, "emoji present in output"));
    }

    // Rule 6: no three identical sentences in a row.
    let sents = sentences(input.unmasked_text);
    if sents.windows(3).any(|w| w[0] == w[1] && w[1] == w[2]) {
        issues.push(ValidationIssue::error(ValidationRule::RepeatedSentence, "same sentence repeated three times in a row"));
    }

    // Rule 7: numeric/date preservation (retryable warning).
    for m in NUMERIC_OR_DATE.find_iter(input.normalized_text) {
        if m.as_str().chars().count() < 2 {
            continue;
        }
        if !input.unmasked_text.contains(m.as_str()) {
            issues.push(
                ValidationIssue::warning(ValidationRule::LengthOutOfBounds, format!("numeric/date value {} not preserved", m.as_str()))
                    .with_match(m.as_str()),
            );
        }
    }

    // Rule 8: redacted originals do not reappear (anti-leak).
    for original in input.redacted_originals {
        if !original.is_empty() && input.unmasked_text.contains(original.as_str()) {
            issues.push(ValidationIssue::error(ValidationRule::RedContentLeaked, "redacted original text reappeared in output"));
        }
    }

    // Rule 9: YELLOW content not dropped (retryable warning).
    for segment in input.yellow_segments.iter().filter(|s| s.tier() == Tier::Yellow) {
        if bag_of_words_similarity(&segment.segment.text, input.unmasked_text) < YELLOW_SIMILARITY_THRESHOLD {
            issues.push(ValidationIssue::warning(
                ValidationRule::ToneMismatch,
                format!("yellow segment {} appears dropped from output", segment.segment.id),
            ));
        }
    }

    // Rule 10: S2_OUR_EFFORT section presence (retryable warning).
    let requires_our_effort = input
        .template
        .effective_sections
        .iter()
        .any(|s| s.key.as_str() == "S2_OUR_EFFORT");
    if requires_our_effort {
        const OUR_EFFORT_MARKERS: &[&str] = &["노력", "최선", "확인해", "검토"];
        if !OUR_EFFORT_MARKERS.iter().any(|m| input.unmasked_text.contains(m)) {
            issues.push(ValidationIssue::warning(ValidationRule::UnresolvedTemplateMarker, "S2_OUR_EFFORT section not found in output"));
        }
    }

    // Rule 11: mustInclude placeholders present.
    for placeholder in input.must_include {
        if !input.unmasked_text.contains(placeholder.as_str()) && !input.raw_content.contains(placeholder.as_str()) {
            issues.push(
                ValidationIssue::error(ValidationRule::MissingPlaceholder, format!("required placeholder {placeholder} missing"))
                    .with_match(placeholder.clone()),
            );
        }
    }

    // Rule 12: length ratio bounds.
    let original_len = input.normalized_text.chars().count().max(1) as f32;
    let output_len = input.unmasked_text.chars().count() as f32;
    let ratio = output_len / original_len;
    if !(LENGTH_RATIO_MIN..=LENGTH_RATIO_MAX).contains(&ratio) {
        issues.push(ValidationIssue::warning(
            ValidationRule::LengthOutOfBounds,
            format!("output/original length ratio {ratio:.2} out of bounds"),
        ));
    }

    ValidationReport { issues, retried: false }
}

/// WARNINGs on rules 7, 9, and 10 trigger a retry; rule 12 (also tagged
/// `LengthOutOfBounds`, for the overall length-ratio check) does not.
fn is_retryable_warning(issue: &ValidationIssue) -> bool {
    match issue.rule {
        ValidationRule::LengthOutOfBounds => issue.message.contains("not preserved"),
        ValidationRule::ToneMismatch | ValidationRule::UnresolvedTemplateMarker => true,
        _ => false,
    }
}

pub fn needs_retry(report: &ValidationReport) -> bool {
    report.has_errors() || report.issues.iter().any(is_retryable_warning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tone_core::segment::Segment;
    use tone_core::span::SpanType;
    use tone_core::template::{EffectiveSection, SectionKey};

    fn template_with(section: SectionKey) -> SelectedTemplate {
        SelectedTemplate {
            id: "T03_APOLOGY".into(),
            name: "Apology".into(),
            effective_sections: vec![EffectiveSection { key: section, expand: false, shorten: false }],
        }
    }

    #[test]
    fn missing_placeholder_is_error() {
        let span = LockedSpan::new(0, "010-1234-5678", SpanType::Phone, 0, 13);
        let input = ValidationInput {
            unmasked_text: "연락처 확인 부탁드립니다",
            raw_content: "연락처 확인 부탁드립니다",
            normalized_text: "연락처 010-1234-5678 확인 부탁드립니다",
            locked_spans: std::slice::from_ref(&span),
            redacted_originals: &[],
            yellow_segments: &[],
            template: &template_with(SectionKey::S5Request),
            persona: Persona::Client,
            must_include: &[],
        };
        let report = validate(&input);
        assert!(report.has_errors());
    }

    #[test]
    fn leaked_marker_is_error() {
        let input = ValidationInput {
            unmasked_text: "내용은 [REDACTED:AGGRESSION_0] 입니다",
            raw_content: "내용은 [REDACTED:AGGRESSION_0] 입니다",
            normalized_text: "내용입니다",
            locked_spans: &[],
            redacted_originals: &[],
            yellow_segments: &[],
            template: &template_with(SectionKey::S5Request),
            persona: Persona::Client,
            must_include: &[],
        };
        let report = validate(&input);
        assert!(report.issues.iter().any(|i| i.rule == ValidationRule::RedContentLeaked));
    }

    #[test]
    fn missing_our_effort_section_is_retryable_warning() {
        let input = ValidationInput {
            unmasked_text: "죄송합니다. 다시 연락드리겠습니다.",
            raw_content: "죄송합니다. 다시 연락드리겠습니다.",
            normalized_text: "죄송합니다.",
            locked_spans: &[],
            redacted_originals: &[],
            yellow_segments: &[],
            template: &template_with(SectionKey::S2OurEffort),
            persona: Persona::Client,
            must_include: &[],
        };
        let report = validate(&input);
        assert!(needs_retry(&report));
    }

    #[test]
    fn clean_output_has_no_errors() {
        let input = ValidationInput {
            unmasked_text: "확인 후 다시 연락드리겠습니다. 최선을 다해 검토하겠습니다.",
            raw_content: "확인 후 다시 연락드리겠습니다. 최선을 다해 검토하겠습니다.",
            normalized_text: "확인 부탁드립니다.",
            locked_spans: &[],
            redacted_originals: &[],
            yellow_segments: &[],
            template: &template_with(SectionKey::S2OurEffort),
            persona: Persona::Client,
            must_include: &[],
        };
        let report = validate(&input);
        assert!(!report.has_errors());
    }

    #[test]
    fn three_identical_sentences_is_error() {
        let input = ValidationInput {
            unmasked_text: "확인하겠습니다. 확인하겠습니다. 확인하겠습니다.",
            raw_content: "확인하겠습니다. 확인하겠습니다. 확인하겠습니다.",
            normalized_text: "확인하겠습니다.",
            locked_spans: &[],
            redacted_originals: &[],
            yellow_segments: &[],
            template: &template_with(SectionKey::S5Request),
            persona: Persona::Client,
            must_include: &[],
        };
        let report = validate(&input);
        assert!(report.issues.iter().any(|i| i.rule == ValidationRule::RepeatedSentence && i.severity == tone_core::validation::Severity::Error));
    }
}
