//! HTTP/SSE transport binding for the tone-rewriting pipeline (§6).
//!
//! A thin concrete wrapper around `tone-pipeline`'s `Orchestrator`: one
//! POST route streams `ProgressEvent`s to the caller over
//! Server-Sent Events, plus the health/readiness/metrics endpoints an
//! orchestrator expects of any service it runs.

pub mod http;
pub mod metrics;
pub mod sse;
pub mod state;

pub use http::create_router;
pub use metrics::init_metrics;
pub use state::AppState;

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
