//! Data model and trait seams shared by every crate in the workspace.

pub mod error;
pub mod fact;
pub mod llm_types;
pub mod progress;
pub mod request;
pub mod segment;
pub mod span;
pub mod template;
pub mod traits;
pub mod validation;

pub use error::{Error, Result};
pub use fact::{Fact, SituationAnalysis};
pub use llm_types::{FinishReason, GenerateRequest, GenerateResponse, Message, Role, StreamChunk, TokenUsage};
pub use progress::{NullProgressSink, Phase, ProgressEvent, ProgressSink};
pub use request::{Context, Persona, RewriteRequest, SenderInfo, Tone};
pub use segment::{LabelStats, LabeledSegment, Label, Segment, Tier};
pub use span::{LockedSpan, SpanType};
pub use template::{EffectiveSection, Section, SectionKey, SelectedTemplate, Template, TemplateId};
pub use traits::{LLMClient, SSESink};
pub use validation::{Severity, ValidationIssue, ValidationReport, ValidationRule};
