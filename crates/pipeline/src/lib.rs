//! The rewrite pipeline: normalizes, masks, segments, labels, and
//! rewrites a Korean business message through a fixed LLM-backed DAG,
//! streaming progress to a caller-supplied sink (§4, §5).

pub mod error;
pub mod orchestrator;
pub mod stages;

pub use error::PipelineError;
pub use orchestrator::Orchestrator;
