//! Anthropic Messages API backend: the concrete `LLMClient` every
//! LLM-backed pipeline stage (Identity-Lock Booster, Segment Refiner,
//! Structure Labeler, Situation Analyzer, Context Gating, Streaming
//! Generator) calls through.
//!
//! Streaming is hand-rolled SSE line buffering rather than an
//! off-the-shelf event-source crate, matching the teacher's own
//! `data: `-line parsing in its Claude backend.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tone_core::error::{Error, Result};
use tone_core::llm_types::{FinishReason, GenerateRequest, GenerateResponse, Role, StreamChunk, TokenUsage};
use tone_core::traits::LLMClient;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            endpoint: "https://api.anthropic.com".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

/// One Anthropic Messages API client, shared across requests. Its
/// `reqwest::Client` pool is internally synchronized, so `&self` is
/// enough for concurrent callers (§5: "must be safe for concurrent use").
pub struct ClaudeClient {
    config: ClaudeConfig,
    client: Client,
    model: String,
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig, model: impl Into<String>) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Configuration(
                "ANTHROPIC_API_KEY not set".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Llm(e.to_string()))?;
        Ok(Self {
            config,
            client,
            model: model.into(),
        })
    }

    fn build_body(&self, request: &GenerateRequest, stream: bool) -> ClaudeRequest {
        let system = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone());
        let messages = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| ClaudeMessage {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::System => unreachable!(),
                }
                .to_string(),
                content: m.content.clone(),
            })
            .collect();

        ClaudeRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system,
            messages,
            stream,
        }
    }

    async fn send_with_retry(&self, body: &ClaudeRequest) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(format!("{}/v1/messages", self.config.endpoint))
                .header("x-api-key", &self.config.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(body)
                .send()
                .await
                .map_err(|e| Error::Llm(e.to_string()))?;

            if response.status().is_success() {
                return Ok(response);
            }
            let status = response.status();
            let transient = status.is_server_error() || status.as_u16() == 429;
            if !transient || attempt >= self.config.max_retries {
                let text = response.text().await.unwrap_or_default();
                return Err(Error::Llm(format!("anthropic api error {status}: {text}")));
            }
            attempt += 1;
            tokio::time::sleep(Duration::from_millis(200 * 2u64.pow(attempt))).await;
        }
    }
}

#[async_trait]
impl LLMClient for ClaudeClient {
    async fn complete(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let body = self.build_body(&request, false);
        let response = self.send_with_retry(&body).await?;
        let parsed: ClaudeMessageResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("invalid anthropic response: {e}")))?;

        let text = parsed
            .content
            .into_iter()
            .map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(GenerateResponse {
            text,
            usage: TokenUsage {
                prompt_tokens: parsed.usage.input_tokens,
                completion_tokens: parsed.usage.output_tokens,
            },
            finish_reason: match parsed.stop_reason.as_deref() {
                Some("max_tokens") => FinishReason::Stop,
                _ => FinishReason::Stop,
            },
        })
    }

    async fn complete_stream(&self, request: GenerateRequest) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let body = self.build_body(&request, true);
        let response = self.send_with_retry(&body).await?;

        let stream = async_stream_from_response(response);
        Ok(Box::pin(stream))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}

/// Buffers raw bytes into `data: ` lines and parses each into a
/// `StreamChunk`. Forwarding failures downstream never stop this from
/// draining the upstream body to completion — see `tone-pipeline`'s
/// streaming generator for the disconnect-but-keep-consuming contract
/// this stream is built to support.
fn async_stream_from_response(response: reqwest::Response) -> impl futures::Stream<Item = Result<StreamChunk>> {
    async_stream::try_stream! {
        let mut bytes_stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut usage = TokenUsage::default();

        while let Some(chunk) = bytes_stream.next().await {
            let chunk = chunk.map_err(|e| Error::Llm(e.to_string()))?;
            buffer.push_str(&String::from_utf8_lossy(&chunk));

            while let Some(line_end) = buffer.find('\n') {
                let line = buffer[..line_end].trim().to_string();
                buffer.drain(..=line_end);
                if line.is_empty() {
                    continue;
                }
                let Some(json_str) = line.strip_prefix("data: ") else { continue };
                if json_str == "[DONE]" {
                    continue;
                }
                let Ok(event) = serde_json::from_str::<ClaudeStreamEvent>(json_str) else { continue };
                match event {
                    ClaudeStreamEvent::MessageStart { message } => {
                        usage.prompt_tokens = message.usage.input_tokens;
                    }
                    ClaudeStreamEvent::ContentBlockDelta { delta } => {
                        yield StreamChunk::Delta(delta.text);
                    }
                    ClaudeStreamEvent::MessageDelta { usage: delta_usage } => {
                        if let Some(u) = delta_usage {
                            usage.completion_tokens = u.output_tokens;
                        }
                    }
                    ClaudeStreamEvent::MessageStop => {
                        yield StreamChunk::Done { usage, finish_reason: FinishReason::Stop };
                    }
                    ClaudeStreamEvent::Other => {}
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeMessageResponse {
    content: Vec<ClaudeTextBlock>,
    usage: ClaudeUsage,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeTextBlock {
    text: String,
}

#[derive(Deserialize, Default, Clone, Copy)]
struct ClaudeUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeStreamEvent {
    MessageStart { message: ClaudeStreamMessage },
    ContentBlockDelta { delta: ClaudeTextDelta },
    MessageDelta { usage: Option<ClaudeUsage> },
    MessageStop,
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ClaudeStreamMessage {
    usage: ClaudeUsage,
}

#[derive(Deserialize)]
struct ClaudeTextDelta {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_api_key() {
        let config = ClaudeConfig {
            api_key: String::new(),
            ..ClaudeConfig::default()
        };
        assert!(ClaudeClient::new(config, "claude-haiku").is_err());
    }
}
