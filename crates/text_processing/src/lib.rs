//! Text-level stages of the tone-rewriting pipeline.
//!
//! Everything here is pure, synchronous, and side-effect free: no
//! network calls, no LLM round-trips. Those live in `tone-llm` and get
//! wired together in `tone-pipeline`.

pub mod enforcer;
pub mod error;
pub mod identity_booster;
pub mod locked_span;
pub mod normalize;
pub mod prompt_builder;
pub mod redactor;
pub mod segmenter;
pub mod template_selector;

pub use error::{Result, TextError};
pub use prompt_builder::{PromptEnvelope, PromptSegment};
pub use redactor::RedactionResult;
