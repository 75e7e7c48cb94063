//! Workspace-wide error type.
//!
//! `tone_pipeline::PipelineError` owns the orchestrator's fatal failure
//! modes and bridges into this one via `From`. `tone_llm` constructs
//! variants here directly (`Llm`, `Configuration`) rather than keeping
//! its own enum, since its failures never need richer structure than
//! "network/API failure" plus a message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("llm error: {0}")]
    Llm(String),

    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("cancelled")]
    Cancelled,

    #[error("wall-clock budget exceeded")]
    WallClockExceeded,
}
