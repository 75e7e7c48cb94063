//! The request envelope the orchestrator accepts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The recipient archetype the message is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Persona {
    Boss,
    Client,
    Professor,
    Parent,
    Official,
    Other,
}

impl Persona {
    /// The high-formality set referenced by the Identity-Lock Booster's gate.
    pub fn is_high_formality(&self) -> bool {
        matches!(self, Persona::Boss | Persona::Client | Persona::Official)
    }
}

/// The situation category the message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Context {
    Request,
    Apology,
    Rejection,
    Complaint,
    FollowUp,
    Introduction,
    Notice,
    Gratitude,
    WarningPrevention,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tone {
    VeryPolite,
    Polite,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderInfo {
    pub name: Option<String>,
    pub role: Option<String>,
}

/// The input envelope to one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub persona: Persona,
    pub contexts: Vec<Context>,
    pub tone: Tone,
    #[serde(default)]
    pub sender: Option<SenderInfo>,
    #[serde(default)]
    pub hint: Option<String>,
    pub text: String,
    /// Caller-supplied toggle for the Identity-Lock Booster gate (§4.4a).
    #[serde(default)]
    pub identity_boost: Option<bool>,
    #[serde(default = "Uuid::new_v4")]
    pub request_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_formality_set_matches_spec() {
        assert!(Persona::Boss.is_high_formality());
        assert!(Persona::Client.is_high_formality());
        assert!(Persona::Official.is_high_formality());
        assert!(!Persona::Parent.is_high_formality());
        assert!(!Persona::Professor.is_high_formality());
        assert!(!Persona::Other.is_high_formality());
    }

    #[test]
    fn persona_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&Persona::Boss).unwrap();
        assert_eq!(json, "\"BOSS\"");
    }
}
