//! Structural templates the Template Selector chooses between.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionKey {
    S0Greeting,
    S1Acknowledge,
    S2OurEffort,
    S3Facts,
    S4Responsibility,
    S5Request,
    S6Options,
    S7Policy,
    S8Closing,
}

impl SectionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::S0Greeting => "S0_GREETING",
            SectionKey::S1Acknowledge => "S1_ACKNOWLEDGE",
            SectionKey::S2OurEffort => "S2_OUR_EFFORT",
            SectionKey::S3Facts => "S3_FACTS",
            SectionKey::S4Responsibility => "S4_RESPONSIBILITY",
            SectionKey::S5Request => "S5_REQUEST",
            SectionKey::S6Options => "S6_OPTIONS",
            SectionKey::S7Policy => "S7_POLICY",
            SectionKey::S8Closing => "S8_CLOSING",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub key: SectionKey,
    pub instruction: &'static str,
    pub length_hint: &'static str,
    pub expression_pool: &'static [&'static str],
}

/// An effective section after per-persona skip rules are applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveSection {
    pub key: SectionKey,
    pub expand: bool,
    pub shorten: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateId {
    T01General,
    T02Request,
    T03Apology,
    T04RejectionSoft,
    T05FollowUp,
    T06Introduction,
    T07Notice,
    T08Gratitude,
    T09Rejection,
    T10ComplaintResponse,
    T11StatusUpdate,
    T12WarningPrevention,
}

impl TemplateId {
    pub fn id_str(&self) -> &'static str {
        match self {
            TemplateId::T01General => "T01_GENERAL",
            TemplateId::T02Request => "T02_REQUEST",
            TemplateId::T03Apology => "T03_APOLOGY",
            TemplateId::T04RejectionSoft => "T04_REJECTION_SOFT",
            TemplateId::T05FollowUp => "T05_FOLLOW_UP",
            TemplateId::T06Introduction => "T06_INTRODUCTION",
            TemplateId::T07Notice => "T07_NOTICE",
            TemplateId::T08Gratitude => "T08_GRATITUDE",
            TemplateId::T09Rejection => "T09_REJECTION",
            TemplateId::T10ComplaintResponse => "T10_COMPLAINT_RESPONSE",
            TemplateId::T11StatusUpdate => "T11_STATUS_UPDATE",
            TemplateId::T12WarningPrevention => "T12_WARNING_PREVENTION",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TemplateId::T01General => "General",
            TemplateId::T02Request => "Request",
            TemplateId::T03Apology => "Apology",
            TemplateId::T04RejectionSoft => "Soft rejection",
            TemplateId::T05FollowUp => "Follow-up",
            TemplateId::T06Introduction => "Introduction",
            TemplateId::T07Notice => "Notice",
            TemplateId::T08Gratitude => "Gratitude",
            TemplateId::T09Rejection => "Rejection",
            TemplateId::T10ComplaintResponse => "Complaint response",
            TemplateId::T11StatusUpdate => "Status update",
            TemplateId::T12WarningPrevention => "Warning / prevention",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Template {
    pub id: TemplateId,
    pub sections: Vec<SectionKey>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedTemplate {
    pub id: String,
    pub name: String,
    pub effective_sections: Vec<EffectiveSection>,
}
