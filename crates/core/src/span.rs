//! Locked spans: substrings that must survive the LLM round-trip unmodified.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanType {
    Date,
    Time,
    HhMm,
    Phone,
    Email,
    Url,
    Money,
    Account,
    UnitNumber,
    LargeNumber,
    Uuid,
    FilePath,
    IssueTicket,
    Version,
    QuotedText,
    Identifier,
    HashCommit,
    /// Added by the Identity-Lock Booster rather than the regex extractor.
    Semantic,
}

impl SpanType {
    /// The `TYPE` token used in `{{TYPE_N}}` placeholders — this implementation's
    /// resolution of the placeholder-format ambiguity (see DESIGN.md).
    pub fn placeholder_tag(&self) -> &'static str {
        match self {
            SpanType::Date => "DATE",
            SpanType::Time => "TIME",
            SpanType::HhMm => "HHMM",
            SpanType::Phone => "PHONE",
            SpanType::Email => "EMAIL",
            SpanType::Url => "URL",
            SpanType::Money => "MONEY",
            SpanType::Account => "ACCOUNT",
            SpanType::UnitNumber => "UNIT",
            SpanType::LargeNumber => "NUM",
            SpanType::Uuid => "UUID",
            SpanType::FilePath => "FILE",
            SpanType::IssueTicket => "TICKET",
            SpanType::Version => "VERSION",
            SpanType::QuotedText => "QUOTE",
            SpanType::Identifier => "ID",
            SpanType::HashCommit => "HASH",
            SpanType::Semantic => "NAME",
        }
    }
}

/// One inviolable substring of the normalized input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedSpan {
    pub index: usize,
    pub original_text: String,
    pub placeholder: String,
    #[serde(rename = "type")]
    pub span_type: SpanType,
    pub start_pos: usize,
    pub end_pos: usize,
}

impl LockedSpan {
    pub fn new(
        index: usize,
        original_text: impl Into<String>,
        span_type: SpanType,
        start_pos: usize,
        end_pos: usize,
    ) -> Self {
        let original_text = original_text.into();
        let placeholder = format!("{{{{{}_{}}}}}", span_type.placeholder_tag(), index);
        debug_assert!(end_pos > start_pos);
        Self {
            index,
            original_text,
            placeholder,
            span_type,
            start_pos,
            end_pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_type_qualified() {
        let span = LockedSpan::new(3, "010-1234-5678", SpanType::Phone, 0, 13);
        assert_eq!(span.placeholder, "{{PHONE_3}}");
    }

    #[test]
    fn placeholder_uniquely_determined_by_type_and_index() {
        let a = LockedSpan::new(1, "a", SpanType::Date, 0, 1);
        let b = LockedSpan::new(1, "b", SpanType::Date, 5, 6);
        assert_eq!(a.placeholder, b.placeholder);
    }
}
