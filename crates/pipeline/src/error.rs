//! Error taxonomy for the orchestrator (§7).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Structure Labeler failed even after its own internal retry — fatal.
    #[error("structure labeler failed: {0}")]
    StructureLabelerFailure(String),

    /// Network/5xx/rate-limit error surfaced from the streaming generator.
    #[error("transient llm error: {0}")]
    TransientLlm(String),

    #[error("cancelled")]
    Cancelled,

    #[error("wall-clock budget exceeded")]
    WallClockExceeded,
}

impl From<PipelineError> for tone_core::Error {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Cancelled => tone_core::Error::Cancelled,
            PipelineError::WallClockExceeded => tone_core::Error::WallClockExceeded,
            other => tone_core::Error::Pipeline(other.to_string()),
        }
    }
}
