//! Meaning Segmenter (§4.5): splits masked text into the units the
//! Structure Labeler assigns one label each. Four boundary families are
//! applied in order, each refining the partition the previous family
//! produced; splits never land inside a `{{TYPE_N}}` placeholder token.

use once_cell::sync::Lazy;
use regex::Regex;
use tone_core::segment::Segment;

/// §4.5: force-split any segment over this length; §4.16 rule 9's bag-of-words
/// check and the labeler's coverage check both operate on segments this size.
const MAX_SEGMENT_CHARS: usize = 180;
/// Force-split search window around the midpoint (§4.5).
const FORCE_SPLIT_WINDOW: usize = 60;
/// Segments shorter than this are candidates for the post-split merge pass.
const SHORT_SEGMENT_CHARS: usize = 5;
/// Merge runs of at least this many consecutive short segments (§4.5).
const MIN_SHORT_RUN: usize = 3;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{[A-Z]+_\d+\}\}").unwrap());

// --- Family 1: strong boundaries ---
static BLANK_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());
static BULLET_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*[-*•]\s").unwrap());
static NUMBERED_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*\d+[.)]\s").unwrap());

// --- Family 2: weak boundaries ---
static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?](?:\s+|$)").unwrap());

// --- Family 3: Korean sentence endings ---
const KOREAN_ENDINGS: &[&str] = &["습니다", "입니다", "세요", "에요", "해요", "합니다", "드립니다", "겠습니다"];
static KOREAN_ENDING: Lazy<Regex> = Lazy::new(|| {
    let alternation = KOREAN_ENDINGS.join("|");
    Regex::new(&format!(r"(?:{alternation})(?:[.!?]?\s+|[.!?]$)")).unwrap()
});

// --- Family 4: transition words ---
const TRANSITION_WORDS: &[&str] = &[
    "그리고", "그런데", "하지만", "따라서", "그래서", "또한", "게다가", "반면에", "한편", "그러나", "근데",
    "더구나", "아울러", "즉", "결국", "그러므로", "왜냐하면", "다만",
];
static TRANSITION_WORD: Lazy<Regex> = Lazy::new(|| {
    let alternation = TRANSITION_WORDS.join("|");
    Regex::new(&format!(r"(?:^|[\s,，]){{1}}(?:{alternation})")).unwrap()
});

fn placeholder_ranges(text: &str) -> Vec<(usize, usize)> {
    PLACEHOLDER.find_iter(text).map(|m| (m.start(), m.end())).collect()
}

fn inside_placeholder(pos: usize, ranges: &[(usize, usize)]) -> bool {
    ranges.iter().any(|(s, e)| pos > *s && pos < *e)
}

/// A boundary cut: text in `[gap_start, gap_end)` belongs to no segment
/// (whitespace/bullet markers consumed by the split itself); the cut
/// point downstream code uses to close the left segment is `gap_start`
/// and to open the right segment is `gap_end`.
fn collect_cuts(text: &str, ranges: &[(usize, usize)]) -> Vec<usize> {
    let mut cuts: Vec<usize> = Vec::new();

    let mut push_cut = |pos: usize| {
        if pos > 0 && pos < text.len() && text.is_char_boundary(pos) && !inside_placeholder(pos, ranges) {
            cuts.push(pos);
        }
    };

    for m in BLANK_LINE.find_iter(text) {
        push_cut(m.start());
        push_cut(m.end());
    }
    for m in BULLET_PREFIX.find_iter(text) {
        push_cut(m.start());
    }
    for m in NUMBERED_PREFIX.find_iter(text) {
        push_cut(m.start());
    }
    for m in SENTENCE_END.find_iter(text) {
        push_cut(m.end());
    }
    for m in KOREAN_ENDING.find_iter(text) {
        push_cut(m.end());
    }
    for m in TRANSITION_WORD.find_iter(text) {
        // The match may include a leading space/comma; the cut belongs
        // right before the connective itself, not before that separator.
        let connective_start = TRANSITION_WORDS
            .iter()
            .filter_map(|w| text[m.start()..m.end()].find(w).map(|rel| m.start() + rel))
            .min()
            .unwrap_or(m.start());
        push_cut(connective_start);
    }

    cuts.sort_unstable();
    cuts.dedup();
    cuts
}

/// Splits `text` into ordered, non-overlapping, placeholder-atomic
/// segments, force-splitting runs over `MAX_SEGMENT_CHARS` and merging
/// runs of 3+ consecutive segments under `SHORT_SEGMENT_CHARS` into one.
pub fn segment(text: &str) -> Vec<Segment> {
    if text.is_empty() {
        return Vec::new();
    }

    let ranges = placeholder_ranges(text);
    let mut cuts = collect_cuts(text, &ranges);
    cuts.push(text.len());

    let mut raw: Vec<(usize, usize)> = Vec::new();
    let mut start = 0usize;
    for cut in cuts {
        if cut <= start {
            continue;
        }
        let trimmed_start = trim_leading(text, start, cut);
        let trimmed_end = trim_trailing(text, trimmed_start, cut);
        if trimmed_end > trimmed_start {
            force_split(text, &ranges, trimmed_start, trimmed_end, &mut raw);
        }
        start = cut;
    }
    if raw.is_empty() {
        raw.push((0, text.len()));
    }

    let merged = merge_short_runs(raw);

    merged
        .into_iter()
        .enumerate()
        .map(|(i, (start, end))| Segment {
            id: format!("T{}", i + 1),
            text: text[start..end].to_string(),
            start,
            end,
        })
        .collect()
}

fn trim_leading(text: &str, start: usize, end: usize) -> usize {
    let mut s = start;
    while s < end && text[s..].starts_with(|c: char| c.is_whitespace()) {
        s += text[s..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
    }
    s
}

fn trim_trailing(text: &str, start: usize, end: usize) -> usize {
    let mut e = end;
    while e > start {
        let prefix = &text[start..e];
        let Some(last) = prefix.chars().last() else { break };
        if last.is_whitespace() {
            e -= last.len_utf8();
        } else {
            break;
        }
    }
    e
}

/// Force-splits a region longer than `MAX_SEGMENT_CHARS` at the nearest
/// space/comma/newline to its midpoint, searching within
/// `FORCE_SPLIT_WINDOW` chars either side (§4.5).
fn force_split(text: &str, ranges: &[(usize, usize)], start: usize, end: usize, out: &mut Vec<(usize, usize)>) {
    if text[start..end].chars().count() <= MAX_SEGMENT_CHARS {
        out.push((start, end));
        return;
    }

    let midpoint = midpoint_byte_offset(text, start, end);
    let window_start = start.max(midpoint.saturating_sub(FORCE_SPLIT_WINDOW));
    let window_end = end.min(midpoint + FORCE_SPLIT_WINDOW);

    let cut = (0..)
        .map(|delta| (midpoint + delta, midpoint.checked_sub(delta)))
        .take_while(|(fwd, back)| *fwd < window_end || back.map(|b| b >= window_start).unwrap_or(false))
        .find_map(|(fwd, back)| {
            if fwd < window_end && is_split_char_at(text, fwd) && !inside_placeholder(fwd, ranges) {
                return Some(fwd);
            }
            if let Some(back) = back {
                if back >= window_start && is_split_char_at(text, back) && !inside_placeholder(back, ranges) {
                    return Some(back);
                }
            }
            None
        });

    match cut {
        Some(cut) if cut > start && cut < end => {
            out.push((start, cut));
            force_split(text, ranges, cut, end, out);
        }
        _ => out.push((start, end)),
    }
}

fn is_split_char_at(text: &str, pos: usize) -> bool {
    if pos == 0 || pos >= text.len() || !text.is_char_boundary(pos) {
        return false;
    }
    matches!(text[..pos].chars().last(), Some(' ') | Some(',') | Some('\n'))
}

fn midpoint_byte_offset(text: &str, start: usize, end: usize) -> usize {
    let char_count = text[start..end].chars().count();
    let target = char_count / 2;
    text[start..end]
        .char_indices()
        .nth(target)
        .map(|(i, _)| start + i)
        .unwrap_or(end)
}

fn merge_short_runs(raw: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    let mut merged: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i < raw.len() {
        let is_short = |range: &(usize, usize)| range.1 - range.0 < SHORT_SEGMENT_CHARS;
        if is_short(&raw[i]) {
            let mut j = i;
            while j < raw.len() && is_short(&raw[j]) {
                j += 1;
            }
            let run_len = j - i;
            if run_len >= MIN_SHORT_RUN {
                merged.push((raw[i].0, raw[j - 1].1));
                i = j;
                continue;
            }
        }
        merged.push(raw[i]);
        i += 1;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_boundary() {
        let segments = segment("확인했습니다. 감사합니다.");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].id, "T1");
        assert_eq!(segments[1].id, "T2");
    }

    #[test]
    fn splits_on_korean_finite_ending() {
        let segments = segment("확인 부탁드립니다 감사합니다");
        assert!(segments.len() >= 2);
    }

    #[test]
    fn splits_on_transition_word() {
        let segments = segment("자료를 확인했습니다 그런데 숫자가 안 맞습니다");
        assert!(segments.iter().any(|s| s.text.starts_with("그런데")));
    }

    #[test]
    fn never_splits_inside_placeholder() {
        let text = "연락처는 {{PHONE_0}}입니다. 확인 부탁드립니다.";
        let segments = segment(text);
        for s in &segments {
            assert!(!s.text.contains("{{PHONE") || s.text.contains("{{PHONE_0}}"));
        }
    }

    #[test]
    fn force_splits_oversized_segment() {
        let long_sentence = format!("가나다라마바사 {}", "단어 ".repeat(80));
        let segments = segment(&long_sentence);
        assert!(segments.iter().all(|s| s.text.chars().count() <= MAX_SEGMENT_CHARS + FORCE_SPLIT_WINDOW));
    }

    #[test]
    fn merges_run_of_three_short_segments() {
        // Each "가." / "나." / "다." is under SHORT_SEGMENT_CHARS; three in a
        // row must merge into a single segment rather than staying separate.
        let segments = segment("가. 나. 다.");
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn does_not_merge_pair_of_short_segments() {
        let segments = segment("가. 나. 확인 부탁드립니다.");
        assert!(segments.len() >= 2);
    }

    #[test]
    fn segments_cover_text_in_document_order() {
        let text = "확인했습니다. 감사합니다. 다음에 또 뵙겠습니다.";
        let segments = segment(text);
        for pair in segments.windows(2) {
            assert!(pair[0].start < pair[1].start);
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn empty_text_yields_no_segments() {
        assert!(segment("").is_empty());
    }
}
