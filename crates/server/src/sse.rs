//! Bridges one orchestrator run's `ProgressEvent`s onto an SSE response
//! channel (§6). Grounded on `ptt.rs::handle_ptt_stream`'s `send_event`
//! closure: serialize the whole event to JSON and push it as one SSE
//! `data:` line, non-blocking so a slow/gone client never stalls the
//! orchestrator.

use std::convert::Infallible;

use axum::response::sse::Event;
use tokio::sync::mpsc::Sender;

use tone_core::progress::ProgressEvent;
use tone_core::traits::SSESink;

use crate::metrics;

pub struct ChannelSink {
    tx: Sender<Result<Event, Infallible>>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Result<Event, Infallible>>) -> Self {
        Self { tx }
    }
}

impl SSESink for ChannelSink {
    fn send(&self, event: ProgressEvent) -> bool {
        record_metrics(&event);
        let data = serde_json::to_string(&event).unwrap_or_default();
        self.tx.try_send(Ok(Event::default().data(data))).is_ok()
    }

    /// `Done` already carries the terminal payload; nothing further to emit.
    fn complete(&self) {}

    fn fail(&self, message: &str) {
        let data = serde_json::to_string(&ProgressEvent::Failed {
            message: message.to_string(),
        })
        .unwrap_or_default();
        let _ = self.tx.try_send(Ok(Event::default().data(data)));
    }
}

/// Derives the §1.1 metrics straight from the events already flowing to
/// the client, rather than threading a separate recorder through the
/// orchestrator.
fn record_metrics(event: &ProgressEvent) {
    match event {
        ProgressEvent::PhaseCompleted { phase, elapsed_ms } => {
            metrics::record_stage_latency(phase.as_str(), *elapsed_ms);
        }
        ProgressEvent::Retrying { .. } => {
            metrics::record_retry();
        }
        ProgressEvent::Stats { stats } => {
            if stats.identity_booster_fired {
                metrics::record_identity_booster_fired();
            }
            if stats.situation_analysis_fired {
                metrics::record_situation_analysis_fired();
            }
            if stats.context_gating_fired {
                metrics::record_context_gating_fired();
            }
        }
        ProgressEvent::Usage { usage } => {
            metrics::record_stage_tokens("analysis", "prompt", usage.analysis_prompt_tokens);
            metrics::record_stage_tokens("analysis", "completion", usage.analysis_completion_tokens);
            metrics::record_stage_tokens("final_generation", "prompt", usage.final_prompt_tokens);
            metrics::record_stage_tokens("final_generation", "completion", usage.final_completion_tokens);
        }
        _ => {}
    }
}
