//! Output Validator findings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationRule {
    MissingPlaceholder,
    FabricatedPlaceholder,
    AlteredLockedSpan,
    RedContentLeaked,
    BannedPhrase,
    WrongHonorific,
    LengthOutOfBounds,
    EmptyOutput,
    RepeatedSentence,
    UnresolvedTemplateMarker,
    BrokenEncoding,
    ToneMismatch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub rule: ValidationRule,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    pub matched_text: Option<String>,
}

impl ValidationIssue {
    pub fn error(rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: Severity::Error,
            message: message.into(),
            matched_text: None,
        }
    }

    pub fn warning(rule: ValidationRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: Severity::Warning,
            message: message.into(),
            matched_text: None,
        }
    }

    pub fn with_match(mut self, matched_text: impl Into<String>) -> Self {
        self.matched_text = Some(matched_text.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub retried: bool,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_flags_errors_but_not_warnings() {
        let mut report = ValidationReport::default();
        report
            .issues
            .push(ValidationIssue::warning(ValidationRule::ToneMismatch, "soft mismatch"));
        assert!(!report.has_errors());
        report
            .issues
            .push(ValidationIssue::error(ValidationRule::MissingPlaceholder, "dropped {{PHONE_1}}"));
        assert!(report.has_errors());
    }
}
