//! Progress reporting from the orchestrator out to the transport layer.

use serde::{Deserialize, Serialize};

/// Named stages of the rewrite pipeline, in the canonical emission
/// order of §4.17/§6: `normalizing, extracting,
/// identity_boosting|identity_skipped, segmenting,
/// segment_refining|segment_refining_skipped, labeling,
/// template_selecting, context_gating|context_gating_skipped,
/// redacting, situation_analyzing|situation_skipped, generating,
/// validating, complete`. The situation-analysis branch runs
/// concurrently with the rest of the chain, but its own completion
/// event always precedes `generating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Normalizing,
    Extracting,
    IdentityBoosting,
    IdentitySkipped,
    Segmenting,
    SegmentRefining,
    SegmentRefiningSkipped,
    Labeling,
    TemplateSelecting,
    ContextGating,
    ContextGatingSkipped,
    Redacting,
    SituationAnalyzing,
    SituationSkipped,
    Generating,
    Validating,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Normalizing => "normalizing",
            Phase::Extracting => "extracting",
            Phase::IdentityBoosting => "identity_boosting",
            Phase::IdentitySkipped => "identity_skipped",
            Phase::Segmenting => "segmenting",
            Phase::SegmentRefining => "segment_refining",
            Phase::SegmentRefiningSkipped => "segment_refining_skipped",
            Phase::Labeling => "labeling",
            Phase::TemplateSelecting => "template_selecting",
            Phase::ContextGating => "context_gating",
            Phase::ContextGatingSkipped => "context_gating_skipped",
            Phase::Redacting => "redacting",
            Phase::SituationAnalyzing => "situation_analyzing",
            Phase::SituationSkipped => "situation_skipped",
            Phase::Generating => "generating",
            Phase::Validating => "validating",
            Phase::Complete => "complete",
        }
    }
}

/// One locked span as reported to the client — the wire-facing mirror
/// of `crate::span::LockedSpan`, stripped to what a client needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanEvent {
    pub placeholder: String,
    pub original: String,
    #[serde(rename = "type")]
    pub span_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentEvent {
    pub id: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEvent {
    pub segment_id: String,
    pub tier: String,
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactEvent {
    pub content: String,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SituationAnalysisEvent {
    pub facts: Vec<FactEvent>,
    pub intent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSelectedEvent {
    pub id: String,
    pub name: String,
    pub sections: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsEvent {
    pub segment_count: usize,
    pub green_count: usize,
    pub yellow_count: usize,
    pub red_count: usize,
    pub locked_span_count: usize,
    pub retry_count: u32,
    pub identity_booster_fired: bool,
    pub situation_analysis_fired: bool,
    pub context_gating_fired: bool,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MonthlyCostEstimate {
    pub mvp: f64,
    pub growth: f64,
    pub mature: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    pub analysis_prompt_tokens: u32,
    pub analysis_completion_tokens: u32,
    pub final_prompt_tokens: u32,
    pub final_completion_tokens: u32,
    pub total_cost_usd: f64,
    pub monthly: MonthlyCostEstimate,
}

/// Events pushed over the SSE stream to the client, in the canonical
/// emission order of §6: phase transitions, the structured artifacts
/// each stage produces, streamed deltas, then the terminal events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    PhaseStarted { phase: Phase },
    PhaseCompleted { phase: Phase, elapsed_ms: u64 },
    Spans { spans: Vec<SpanEvent> },
    MaskedText { text: String },
    Segments { segments: Vec<SegmentEvent> },
    Labels { labels: Vec<LabelEvent> },
    SituationAnalysis { analysis: SituationAnalysisEvent },
    /// Debug-only text with YELLOW softening and RED removal markers
    /// inlined; see SPEC_FULL.md's note on the source's partially
    /// redundant `processedText` event.
    ProcessedText { text: String },
    TemplateSelected { template: TemplateSelectedEvent },
    Token { text: String },
    Retrying { reason: String },
    ValidationIssues { issues: Vec<crate::validation::ValidationIssue> },
    Stats { stats: StatsEvent },
    Usage { usage: UsageEvent },
    Done { request_id: uuid::Uuid, text: String, total_ms: u64 },
    Failed { message: String },
}

/// Sink the orchestrator pushes `ProgressEvent`s into as it runs.
/// Implementations must never let a disconnected sink cancel the
/// upstream generation; see `tone_llm`'s streaming backend for the
/// cancellation-token boundary that governs that instead.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// A sink that drops every event. Used by non-streaming call sites and tests.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: ProgressEvent) {}
}
