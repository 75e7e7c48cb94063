//! Meaning units of masked text and their tier/label assignment.

use serde::{Deserialize, Serialize};

/// A contiguous span of masked text, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Green,
    Yellow,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    // GREEN
    CoreFact,
    CoreIntent,
    Request,
    Apology,
    Courtesy,
    // YELLOW
    Accountability,
    SelfJustification,
    NegativeFeedback,
    Emotional,
    ExcessDetail,
    Speculation,
    // RED
    Blame,
    Aggression,
    PersonalAttack,
    PrivateTmi,
    Grumble,
    SelfDefense,
}

impl Label {
    pub fn tier(&self) -> Tier {
        match self {
            Label::CoreFact | Label::CoreIntent | Label::Request | Label::Apology | Label::Courtesy => {
                Tier::Green
            }
            Label::Accountability
            | Label::SelfJustification
            | Label::NegativeFeedback
            | Label::Emotional
            | Label::ExcessDetail
            | Label::Speculation => Tier::Yellow,
            Label::Blame
            | Label::Aggression
            | Label::PersonalAttack
            | Label::PrivateTmi
            | Label::Grumble
            | Label::SelfDefense => Tier::Red,
        }
    }

    /// Renders the label back to the `SCREAMING_SNAKE_CASE` token
    /// `parse` accepts — used to build redaction markers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::CoreFact => "CORE_FACT",
            Label::CoreIntent => "CORE_INTENT",
            Label::Request => "REQUEST",
            Label::Apology => "APOLOGY",
            Label::Courtesy => "COURTESY",
            Label::Accountability => "ACCOUNTABILITY",
            Label::SelfJustification => "SELF_JUSTIFICATION",
            Label::NegativeFeedback => "NEGATIVE_FEEDBACK",
            Label::Emotional => "EMOTIONAL",
            Label::ExcessDetail => "EXCESS_DETAIL",
            Label::Speculation => "SPECULATION",
            Label::Blame => "BLAME",
            Label::Aggression => "AGGRESSION",
            Label::PersonalAttack => "PERSONAL_ATTACK",
            Label::PrivateTmi => "PRIVATE_TMI",
            Label::Grumble => "GRUMBLE",
            Label::SelfDefense => "SELF_DEFENSE",
        }
    }

    /// Parses the label tokens emitted by the Structure Labeler's
    /// `<segmentId>|<LABEL>|<exactSubstring>` line format.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim() {
            "CORE_FACT" => Label::CoreFact,
            "CORE_INTENT" => Label::CoreIntent,
            "REQUEST" => Label::Request,
            "APOLOGY" => Label::Apology,
            "COURTESY" => Label::Courtesy,
            "ACCOUNTABILITY" => Label::Accountability,
            "SELF_JUSTIFICATION" => Label::SelfJustification,
            "NEGATIVE_FEEDBACK" => Label::NegativeFeedback,
            "EMOTIONAL" => Label::Emotional,
            "EXCESS_DETAIL" => Label::ExcessDetail,
            "SPECULATION" => Label::Speculation,
            "BLAME" => Label::Blame,
            "AGGRESSION" => Label::Aggression,
            "PERSONAL_ATTACK" => Label::PersonalAttack,
            "PRIVATE_TMI" => Label::PrivateTmi,
            "GRUMBLE" => Label::Grumble,
            "SELF_DEFENSE" => Label::SelfDefense,
            _ => return None,
        })
    }
}

/// A `Segment` plus its tier/label assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSegment {
    pub segment: Segment,
    pub label: Label,
}

impl LabeledSegment {
    pub fn tier(&self) -> Tier {
        self.label.tier()
    }
}

/// Aggregate label counts used by the Template Selector.
#[derive(Debug, Clone, Default)]
pub struct LabelStats {
    pub green_count: usize,
    pub yellow_count: usize,
    pub red_count: usize,
    pub has_accountability: bool,
    pub has_negative_feedback: bool,
    pub has_emotional: bool,
    pub has_self_justification: bool,
    pub has_aggression: bool,
}

impl LabelStats {
    pub fn from_labeled(segments: &[LabeledSegment]) -> Self {
        let mut stats = LabelStats::default();
        for s in segments {
            match s.tier() {
                Tier::Green => stats.green_count += 1,
                Tier::Yellow => stats.yellow_count += 1,
                Tier::Red => stats.red_count += 1,
            }
            match s.label {
                Label::Accountability => stats.has_accountability = true,
                Label::NegativeFeedback => stats.has_negative_feedback = true,
                Label::Emotional => stats.has_emotional = true,
                Label::SelfJustification => stats.has_self_justification = true,
                Label::Aggression => stats.has_aggression = true,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_partition_matches_spec() {
        assert_eq!(Label::CoreFact.tier(), Tier::Green);
        assert_eq!(Label::Accountability.tier(), Tier::Yellow);
        assert_eq!(Label::Blame.tier(), Tier::Red);
    }

    #[test]
    fn parse_rejects_unknown_label() {
        assert!(Label::parse("NOT_A_LABEL").is_none());
        assert_eq!(Label::parse("CORE_FACT"), Some(Label::CoreFact));
    }

    #[test]
    fn as_str_round_trips_through_parse() {
        assert_eq!(Label::parse(Label::Aggression.as_str()), Some(Label::Aggression));
        assert_eq!(Label::PersonalAttack.as_str(), "PERSONAL_ATTACK");
    }
}
