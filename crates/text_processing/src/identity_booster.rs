//! Identity-Lock Booster support: the pure, regex-free half of §4.4.
//! The LLM call that proposes candidate proper-noun lines lives in
//! `tone-pipeline` (it is the only part of this stage that talks to a
//! model); everything here is the deterministic gate check and the
//! word-boundary-aware occurrence search that turns candidate names
//! into `LockedSpan`s once the model has named them.

use tone_core::request::Persona;
use tone_core::span::{LockedSpan, SpanType};

/// §4.4 gate: fires when the caller opted in, or when the persona is
/// in the high-formality set and the text is long enough relative to
/// how few spans are already locked that another placeholder is worth
/// the model's attention.
pub fn should_fire(
    caller_toggle: Option<bool>,
    persona: Persona,
    existing_span_count: usize,
    normalized_len_chars: usize,
    min_text_length: usize,
    max_existing_locked_spans: usize,
) -> bool {
    if let Some(toggle) = caller_toggle {
        return toggle;
    }
    persona.is_high_formality()
        && existing_span_count <= max_existing_locked_spans
        && normalized_len_chars >= min_text_length
}

fn is_hangul(c: char) -> bool {
    matches!(c as u32, 0xAC00..=0xD7A3 | 0x1100..=0x11FF | 0x3130..=0x318F)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || is_hangul(c)
}

/// True if `text[start..end]` is not directly adjacent to another word
/// character of the same script family — Hangul names must not abut
/// more Hangul, ASCII names not abut more ASCII/digits.
fn is_boundary_clean(text: &str, start: usize, end: usize) -> bool {
    let before_ok = text[..start]
        .chars()
        .next_back()
        .map(|c| !is_word_char(c))
        .unwrap_or(true);
    let after_ok = text[end..]
        .chars()
        .next()
        .map(|c| !is_word_char(c))
        .unwrap_or(true);
    before_ok && after_ok
}

fn overlaps_existing(start: usize, end: usize, existing: &[LockedSpan]) -> bool {
    existing.iter().any(|s| start < s.end_pos && end > s.start_pos)
}

/// Finds every word-boundary-aware, non-overlapping occurrence of each
/// candidate name in `text`, builds `SEMANTIC` spans for them, merges
/// them with `existing`, sorts by start, and re-indexes the whole set
/// contiguously — the "merge; re-index" step of §4.4.
pub fn merge_candidate_names(
    text: &str,
    candidates: &[String],
    existing: &[LockedSpan],
) -> Vec<LockedSpan> {
    let mut found: Vec<(usize, usize, String)> = Vec::new();
    for name in candidates {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let mut search_from = 0usize;
        while let Some(rel) = text[search_from..].find(name) {
            let start = search_from + rel;
            let end = start + name.len();
            search_from = end;
            if !is_boundary_clean(text, start, end) {
                continue;
            }
            if overlaps_existing(start, end, existing)
                || found.iter().any(|(s, e, _)| start < *e && end > *s)
            {
                continue;
            }
            found.push((start, end, name.to_string()));
        }
    }

    let mut all: Vec<(usize, usize, String, SpanType)> = existing
        .iter()
        .map(|s| (s.start_pos, s.end_pos, s.original_text.clone(), s.span_type))
        .chain(found.into_iter().map(|(s, e, name)| (s, e, name, SpanType::Semantic)))
        .collect();
    all.sort_by_key(|(start, ..)| *start);

    all.into_iter()
        .enumerate()
        .map(|(i, (start, end, text, span_type))| LockedSpan::new(i, text, span_type, start, end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_fires_for_high_formality_persona_with_long_text() {
        assert!(should_fire(None, Persona::Boss, 1, 80, 80, 1));
        assert!(!should_fire(None, Persona::Parent, 0, 200, 80, 1));
        assert!(!should_fire(None, Persona::Boss, 2, 200, 80, 1));
    }

    #[test]
    fn caller_toggle_overrides_persona_gate() {
        assert!(should_fire(Some(true), Persona::Parent, 5, 10, 80, 1));
        assert!(!should_fire(Some(false), Persona::Boss, 0, 200, 80, 1));
    }

    #[test]
    fn finds_name_respecting_hangul_boundary() {
        let text = "김철수 담당자님께 안내드립니다. 김철수님 확인 부탁드립니다.";
        let spans = merge_candidate_names(text, &["김철수".to_string()], &[]);
        // The second "김철수" is immediately followed by "님" (Hangul), so
        // only the first occurrence passes the boundary check.
        assert_eq!(spans.len(), 1);
        assert!(spans.iter().all(|s| s.span_type == SpanType::Semantic));
    }

    #[test]
    fn skips_overlap_with_existing_span() {
        let existing = vec![LockedSpan::new(0, "010-1234-5678", SpanType::Phone, 0, 13)];
        let text = "010-1234-5678 is the number";
        let spans = merge_candidate_names(text, &["010-1234-5678".to_string()], &existing);
        assert_eq!(spans.len(), 1);
    }

    #[test]
    fn reindexes_contiguously_after_merge() {
        let existing = vec![LockedSpan::new(0, "a@b.com", SpanType::Email, 20, 27)];
        let text = "연락처 a@b.com 김철수";
        let spans = merge_candidate_names(text, &["김철수".to_string()], &existing);
        let indices: Vec<usize> = spans.iter().map(|s| s.index).collect();
        assert_eq!(indices, (0..spans.len()).collect::<Vec<_>>());
    }
}
