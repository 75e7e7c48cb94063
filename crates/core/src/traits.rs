//! Seams the pipeline crate composes against.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::llm_types::{GenerateRequest, GenerateResponse, StreamChunk};
use crate::progress::{ProgressEvent, ProgressSink};

/// A chat-completion backend. Every stage that calls an LLM (the
/// Structure Labeler, Situation Analyzer, Context Gating check, and the
/// Streaming Generator) goes through this trait so the pipeline crate
/// never depends on a concrete provider.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Streams deltas; the returned stream keeps producing chunks even
    /// after a downstream sink disconnects — callers cancel generation
    /// explicitly via their own cancellation token, never implicitly by
    /// dropping the stream.
    async fn complete_stream(&self, request: GenerateRequest) -> Result<BoxStream<'static, Result<StreamChunk>>>;

    fn model_name(&self) -> &str;

    /// Cheap local readiness check backing `GET /ready` (§6.1). Never
    /// makes a network call; a client with no credentials configured
    /// reports unavailable.
    fn is_available(&self) -> bool {
        true
    }
}

/// Forwards `ProgressEvent`s emitted during one rewrite run out to the
/// transport layer's SSE response. `send` reports whether the event
/// reached the client; a `false` marks the sink disconnected but must
/// never stop the orchestrator from driving the rest of the pipeline
/// to completion (§5, §7 `SinkDisconnected`).
pub trait SSESink: Send + Sync {
    fn send(&self, event: ProgressEvent) -> bool;
    fn complete(&self);
    fn fail(&self, message: &str);
}

impl<T: SSESink + ?Sized> ProgressSink for T {
    fn emit(&self, event: ProgressEvent) {
        self.send(event);
    }
}
