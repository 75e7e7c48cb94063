//! Red-Label Enforcer (§4.8): a server-side pass that overrides the
//! Structure Labeler's output for anything matching a hard-coded
//! pattern, so a mislabeled profanity, ability-denial insult, or threat
//! can never slip through on a model's say-so alone.
//!
//! Two tiers, applied in order:
//! - **Confirmed**: profanity, ability-denial (`그것도 못`, `뇌가 있`, …),
//!   and sarcastic praise with an exclamation suffix force RED
//!   (`AGGRESSION` for profanity/threat, `PERSONAL_ATTACK` for
//!   ability-denial/insults) regardless of the current label.
//! - **Ambiguous**: soft profanity only promotes a currently-GREEN
//!   segment to YELLOW `EMOTIONAL`; it never forces RED. Running this
//!   twice on the same input is a no-op either way.

use once_cell::sync::Lazy;
use regex::RegexSet;
use tone_core::segment::{Label, LabeledSegment, Tier};

/// Confirmed profanity — always forces RED `AGGRESSION`.
static PROFANITY: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"씨발", r"ㅅㅂ", r"개새끼", r"병신", r"좆", r"지랄", r"시발"]).unwrap()
});

/// Confirmed threats — always forces RED `AGGRESSION`.
static THREAT: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"가만.{0,4}안\s?둔다", r"고소하겠", r"법적.{0,4}조치", r"각오해"]).unwrap()
});

/// Confirmed ability-denial / personal insults — always forces RED
/// `PERSONAL_ATTACK` (§4.8: `그것도 못`, `뇌가 있`, `무능`, …).
static ABILITY_DENIAL: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"그것도\s?못", r"뇌가\s?있", r"무능", r"멍청", r"한심", r"자격.{0,4}없"]).unwrap()
});

/// Sarcastic praise followed by an exclamation mark — forces RED
/// `PERSONAL_ATTACK` (§4.8's "sarcastic-praise with exclamation suffix").
static SARCASTIC_PRAISE: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([r"잘한다!", r"잘났다!", r"대단하다!"]).unwrap()
});

/// Ambiguous / soft profanity — promotes GREEN to YELLOW `EMOTIONAL`
/// only; never forces RED (§4.8).
static SOFT_PROFANITY: Lazy<RegexSet> = Lazy::new(|| RegexSet::new([r"미친", r"개같", r"ㅈㄴ"]).unwrap());

pub fn enforce(segments: Vec<LabeledSegment>) -> Vec<LabeledSegment> {
    segments
        .into_iter()
        .map(|mut s| {
            let text = &s.segment.text;
            if PROFANITY.is_match(text) || THREAT.is_match(text) {
                s.label = Label::Aggression;
            } else if ABILITY_DENIAL.is_match(text) || SARCASTIC_PRAISE.is_match(text) {
                s.label = Label::PersonalAttack;
            } else if s.tier() == Tier::Green && SOFT_PROFANITY.is_match(text) {
                s.label = Label::Emotional;
            }
            s
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tone_core::segment::Segment;

    fn labeled(text: &str, label: Label) -> LabeledSegment {
        LabeledSegment {
            segment: Segment {
                id: "seg_0".into(),
                text: text.into(),
                start: 0,
                end: text.len(),
            },
            label,
        }
    }

    #[test]
    fn overrides_mislabeled_profanity() {
        let input = vec![labeled("이 병신 같은 서비스", Label::CoreFact)];
        let out = enforce(input);
        assert_eq!(out[0].label, Label::Aggression);
        assert_eq!(out[0].tier(), Tier::Red);
    }

    #[test]
    fn ability_denial_forces_personal_attack() {
        let input = vec![labeled("ㅅㅂ 이거 그것도 못 해요?", Label::Request)];
        let out = enforce(input);
        // THREAT/PROFANITY checked first; profanity wins the same segment,
        // matching the spec scenario's "enforcer overrides to RED" outcome.
        assert_eq!(out[0].tier(), Tier::Red);
    }

    #[test]
    fn ability_denial_alone_is_personal_attack() {
        let input = vec![labeled("그것도 못 하나요", Label::NegativeFeedback)];
        let out = enforce(input);
        assert_eq!(out[0].label, Label::PersonalAttack);
    }

    #[test]
    fn soft_profanity_promotes_green_to_yellow_only() {
        let input = vec![labeled("아 진짜 미친 일정이네요", Label::CoreFact)];
        let out = enforce(input);
        assert_eq!(out[0].label, Label::Emotional);
        assert_eq!(out[0].tier(), Tier::Yellow);
    }

    #[test]
    fn soft_profanity_never_forces_red() {
        let input = vec![labeled("미친 일정이네요", Label::Request)];
        let out = enforce(input);
        assert_ne!(out[0].tier(), Tier::Red);
    }

    #[test]
    fn is_idempotent() {
        let once = enforce(vec![labeled("고소하겠습니다", Label::Request)]);
        let twice = enforce(once.clone());
        assert_eq!(once[0].label, twice[0].label);

        let once_soft = enforce(vec![labeled("미친 일정이네요", Label::CoreFact)]);
        let twice_soft = enforce(once_soft.clone());
        assert_eq!(once_soft[0].label, twice_soft[0].label);
    }

    #[test]
    fn leaves_unmatched_labels_untouched() {
        let input = vec![labeled("확인 부탁드립니다", Label::Request)];
        let out = enforce(input);
        assert_eq!(out[0].label, Label::Request);
    }
}
