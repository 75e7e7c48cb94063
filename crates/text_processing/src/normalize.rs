//! Text Normalizer (§4.1): the seven-step, pure and deterministic
//! clean-up pass that must run before span locking so offsets in every
//! later stage are stable.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static MULTI_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static TRAILING_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+\n").unwrap());

/// Invisible code points that carry no visible meaning but corrupt span
/// offsets and regex matching if left in place (§4.1 step 2).
const INVISIBLE_CHARS: &[char] = &[
    '\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}', '\u{00AD}', '\u{2060}', '\u{180E}',
];

fn is_stripped_control(c: char) -> bool {
    c.is_control() && c != '\n' && c != '\r' && c != '\t'
}

/// Runs the seven steps of §4.1 in order: (1) NFC, (2) strip invisible
/// code points, (3) strip control chars except `\n \r \t`, (4) unify
/// line endings to `\n`, (5) collapse space/tab runs, (6) collapse 3+
/// newlines to exactly two, (7) trim outer whitespace. Pure and
/// idempotent: normalizing already-normalized text is a no-op.
pub fn normalize(text: &str) -> String {
    let composed: String = text.nfc().collect();

    let cleaned: String = composed
        .chars()
        .filter(|c| !INVISIBLE_CHARS.contains(c) && !is_stripped_control(*c))
        .collect();

    let unified = cleaned.replace("\r\n", "\n").replace('\r', "\n");
    let spaced = MULTI_SPACE.replace_all(&unified, " ");
    let trimmed_lines = TRAILING_SPACE.replace_all(&spaced, "\n");
    let collapsed = MULTI_NEWLINE.replace_all(&trimmed_lines, "\n\n");
    collapsed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_of_whitespace() {
        assert_eq!(normalize("안녕하세요   반갑습니다"), "안녕하세요 반갑습니다");
    }

    #[test]
    fn strips_invisible_characters() {
        assert_eq!(normalize("안\u{200B}녕\u{FEFF}하세요"), "안녕하세요");
    }

    #[test]
    fn strips_control_chars_but_keeps_tab_and_newline() {
        let input = "가\u{0007}나\t다\n라";
        assert_eq!(normalize(input), "가나\t다\n라");
    }

    #[test]
    fn unifies_crlf_to_lf() {
        assert_eq!(normalize("가\r\n나\r다"), "가\n나\n다");
    }

    #[test]
    fn collapses_three_or_more_newlines_to_two() {
        assert_eq!(normalize("가\n\n\n\n나"), "가\n\n나");
    }

    #[test]
    fn composes_to_nfc() {
        // "가" decomposed into its jamo (NFD) must recompose to the
        // single precomposed syllable (NFC) under normalization.
        let nfd = "\u{1100}\u{1161}"; // ㄱ + ㅏ -> 가
        assert_eq!(normalize(nfd), "가");
    }

    #[test]
    fn is_idempotent() {
        let once = normalize("a\n\n\n\nb   c");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }
}
