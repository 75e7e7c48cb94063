//! Streaming Generator (§4.14): issues the final streaming LLM call and
//! forwards deltas to the progress sink as they arrive. A disconnected
//! sink (`send` returning `false`) never stops this from draining the
//! upstream stream to completion — see `tone_core::traits::SSESink`.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use tone_config::StageModelConfig;
use tone_core::llm_types::{GenerateRequest, Message, Role, StreamChunk, TokenUsage};
use tone_core::progress::{ProgressEvent, ProgressSink};
use tone_core::traits::LLMClient;
use tone_text::locked_span::unmask;
use tone_core::span::LockedSpan;

use crate::error::PipelineError;

pub struct GenerateResult {
    pub raw_content: String,
    pub unmasked_text: String,
    pub usage: TokenUsage,
}

/// Streams the final generation, forwarding each delta to `sink` as a
/// `ProgressEvent::Token`, then unmasks the assembled text against
/// `locked_spans` once the stream closes.
pub async fn generate(
    llm: &dyn LLMClient,
    config: &StageModelConfig,
    system_prompt: String,
    user_message: String,
    locked_spans: &[LockedSpan],
    sink: &dyn ProgressSink,
    cancel: CancellationToken,
) -> Result<GenerateResult, PipelineError> {
    let request = GenerateRequest {
        messages: vec![
            Message { role: Role::System, content: system_prompt },
            Message::user(user_message),
        ],
        model: config.model.clone(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let mut stream = tokio::select! {
        _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
        result = llm.complete_stream(request) => result.map_err(|e| PipelineError::TransientLlm(e.to_string()))?,
    };

    let mut raw_content = String::new();
    let mut usage = TokenUsage::default();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            next = stream.next() => match next {
                Some(chunk) => chunk.map_err(|e| PipelineError::TransientLlm(e.to_string()))?,
                None => break,
            },
        };
        match chunk {
            StreamChunk::Delta(text) => {
                sink.emit(ProgressEvent::Token { text: text.clone() });
                raw_content.push_str(&text);
            }
            StreamChunk::Done { usage: final_usage, .. } => {
                usage = final_usage;
            }
        }
    }

    let unmasked_text = unmask(&raw_content, locked_spans);
    Ok(GenerateResult { raw_content, unmasked_text, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSink {
        tokens: std::sync::Mutex<Vec<String>>,
    }

    impl ProgressSink for RecordingSink {
        fn emit(&self, event: ProgressEvent) {
            if let ProgressEvent::Token { text } = event {
                self.tokens.lock().unwrap().push(text);
            }
        }
    }

    #[test]
    fn unmask_restores_locked_spans_after_generation() {
        let span = LockedSpan::new(0, "010-1234-5678", tone_core::span::SpanType::Phone, 0, 13);
        let raw = "연락처는 {{PHONE_0}}입니다".to_string();
        let restored = unmask(&raw, std::slice::from_ref(&span));
        assert_eq!(restored, "연락처는 010-1234-5678입니다");
    }

    #[test]
    fn recording_sink_collects_tokens_in_order() {
        let sink = RecordingSink { tokens: std::sync::Mutex::new(Vec::new()) };
        sink.emit(ProgressEvent::Token { text: "안".into() });
        sink.emit(ProgressEvent::Token { text: "녕".into() });
        assert_eq!(*sink.tokens.lock().unwrap(), vec!["안".to_string(), "녕".to_string()]);
    }
}
