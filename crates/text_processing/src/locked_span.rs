//! Locked-Span Extractor and the mask/unmask pair that wraps it.
//!
//! Patterns run in a fixed priority order; when two matches overlap the
//! one that starts earlier wins, and a tie on start position goes to the
//! longer match.

use once_cell::sync::Lazy;
use regex::Regex;
use tone_core::span::{LockedSpan, SpanType};

struct PatternEntry {
    span_type: SpanType,
    pattern: &'static Lazy<Regex>,
}

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}[-./]\d{1,2}[-./]\d{1,2}|\d{1,2}월\s?\d{1,2}일").unwrap());
static HHMM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{1,2}:\d{2}(:\d{2})?\b").unwrap());
static TIME_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(오전|오후)\s?\d{1,2}시(\s?\d{1,2}분)?\b").unwrap());
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b0\d{1,2}-?\d{3,4}-?\d{4}\b").unwrap());
static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[\w.+-]+@[\w-]+\.[\w.-]+\b").unwrap());
static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bhttps?://[^\s]+|\bwww\.[^\s]+").unwrap());
static MONEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}(,\d{3})*(\.\d+)?\s?(원|만원|억원)\b").unwrap());
static ACCOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{2,6}-\d{2,6}-\d{2,8}\b").unwrap());
static UNIT_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,4}\s?(동|호|층)\b").unwrap());
static LARGE_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{1,3}(,\d{3}){2,}\b").unwrap());
static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b").unwrap()
});
static FILE_PATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:[A-Za-z]:\\|/)[\w./\\-]+\.\w+\b").unwrap());
static ISSUE_TICKET_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Z]{2,6}-\d{2,6}\b").unwrap());
static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bv?\d+\.\d+(\.\d+)?\b").unwrap());
static QUOTED_TEXT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("\"[^\"]+\"|'[^']+'|「[^」]+」").unwrap());
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z]{1,4}\d{4,}\b").unwrap());
static HASH_COMMIT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[0-9a-f]{7,40}\b").unwrap());

/// Priority order: earlier entries win a tie at the same start position
/// only if they are also longer; see `extract`'s sort.
static PATTERNS: Lazy<Vec<PatternEntry>> = Lazy::new(|| {
    vec![
        PatternEntry { span_type: SpanType::Uuid, pattern: &UUID_PATTERN },
        PatternEntry { span_type: SpanType::Email, pattern: &EMAIL_PATTERN },
        PatternEntry { span_type: SpanType::Url, pattern: &URL_PATTERN },
        PatternEntry { span_type: SpanType::FilePath, pattern: &FILE_PATH_PATTERN },
        PatternEntry { span_type: SpanType::Date, pattern: &DATE_PATTERN },
        PatternEntry { span_type: SpanType::Time, pattern: &TIME_PATTERN },
        PatternEntry { span_type: SpanType::HhMm, pattern: &HHMM_PATTERN },
        PatternEntry { span_type: SpanType::Phone, pattern: &PHONE_PATTERN },
        PatternEntry { span_type: SpanType::Account, pattern: &ACCOUNT_PATTERN },
        PatternEntry { span_type: SpanType::Money, pattern: &MONEY_PATTERN },
        PatternEntry { span_type: SpanType::UnitNumber, pattern: &UNIT_NUMBER_PATTERN },
        PatternEntry { span_type: SpanType::IssueTicket, pattern: &ISSUE_TICKET_PATTERN },
        PatternEntry { span_type: SpanType::Version, pattern: &VERSION_PATTERN },
        PatternEntry { span_type: SpanType::QuotedText, pattern: &QUOTED_TEXT_PATTERN },
        PatternEntry { span_type: SpanType::Identifier, pattern: &IDENTIFIER_PATTERN },
        PatternEntry { span_type: SpanType::HashCommit, pattern: &HASH_COMMIT_PATTERN },
        PatternEntry { span_type: SpanType::LargeNumber, pattern: &LARGE_NUMBER_PATTERN },
    ]
});

#[derive(Debug, Clone, Copy)]
struct RawMatch {
    span_type: SpanType,
    start: usize,
    end: usize,
}

/// Runs every pattern over `text`, then resolves overlaps so the result
/// is a set of disjoint, document-ordered spans.
pub fn extract(text: &str) -> Vec<LockedSpan> {
    let mut candidates: Vec<RawMatch> = Vec::new();
    for entry in PATTERNS.iter() {
        for m in entry.pattern.find_iter(text) {
            candidates.push(RawMatch {
                span_type: entry.span_type,
                start: m.start(),
                end: m.end(),
            });
        }
    }

    // Earliest start wins; a tie on start goes to the longer match.
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut accepted: Vec<RawMatch> = Vec::new();
    let mut cursor = 0usize;
    for candidate in candidates {
        if candidate.start < cursor {
            continue;
        }
        cursor = candidate.end;
        accepted.push(candidate);
    }

    accepted
        .into_iter()
        .enumerate()
        .map(|(i, m)| LockedSpan::new(i, &text[m.start..m.end], m.span_type, m.start, m.end))
        .collect()
}

/// Replaces every locked span's original text with its placeholder,
/// right to left so earlier offsets stay valid.
pub fn mask(text: &str, spans: &[LockedSpan]) -> String {
    let mut ordered: Vec<&LockedSpan> = spans.iter().collect();
    ordered.sort_by(|a, b| b.start_pos.cmp(&a.start_pos));
    let mut out = text.to_string();
    for span in ordered {
        out.replace_range(span.start_pos..span.end_pos, &span.placeholder);
    }
    out
}

/// Substitutes every placeholder in `masked` back to its original text.
pub fn unmask(masked: &str, spans: &[LockedSpan]) -> String {
    let mut out = masked.to_string();
    for span in spans {
        out = out.replace(&span.placeholder, &span.original_text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_phone_and_email() {
        let spans = extract("제 번호는 010-1234-5678이고 메일은 a@b.com 입니다");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].span_type, SpanType::Phone);
        assert_eq!(spans[1].span_type, SpanType::Email);
    }

    #[test]
    fn longer_match_wins_on_tied_start() {
        // A UUID-shaped string also partially matches the hex-commit pattern;
        // the UUID (higher priority, same start, longer) must win.
        let spans = extract("id: 123e4567-e89b-12d3-a456-426614174000 done");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].span_type, SpanType::Uuid);
    }

    #[test]
    fn mask_then_unmask_round_trips() {
        let text = "연락처 010-1234-5678 확인 부탁드립니다";
        let spans = extract(text);
        let masked = mask(text, &spans);
        assert!(masked.contains("{{PHONE_0}}"));
        assert_eq!(unmask(&masked, &spans), text);
    }
}
