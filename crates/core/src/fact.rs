//! Structured facts extracted by the Situation Analyzer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub content: String,
    /// Verbatim substring of masked text the fact was extracted from.
    /// May contain placeholders.
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SituationAnalysis {
    pub facts: Vec<Fact>,
    pub intent: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}
