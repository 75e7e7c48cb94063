//! Prometheus metrics (§1.1): request/retry counters, per-stage
//! latency and token histograms, and the three optional-stage fired
//! counters. Installed once at startup and rendered at `GET /metrics`.

use axum::extract::State;
use axum::http::StatusCode;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}

pub fn record_request() {
    metrics::counter!("tone_requests_total").increment(1);
}

pub fn record_retry() {
    metrics::counter!("tone_retries_total").increment(1);
}

pub fn record_stage_latency(stage: &'static str, millis: u64) {
    metrics::histogram!("tone_stage_latency_ms", "stage" => stage).record(millis as f64);
}

pub fn record_stage_tokens(stage: &'static str, kind: &'static str, tokens: u32) {
    metrics::histogram!("tone_stage_tokens", "stage" => stage, "kind" => kind).record(tokens as f64);
}

pub fn record_identity_booster_fired() {
    metrics::counter!("tone_identity_booster_fired_total").increment(1);
}

pub fn record_situation_analysis_fired() {
    metrics::counter!("tone_situation_analysis_fired_total").increment(1);
}

pub fn record_context_gating_fired() {
    metrics::counter!("tone_context_gating_fired_total").increment(1);
}

pub async fn metrics_handler(State(state): State<AppState>) -> (StatusCode, String) {
    (StatusCode::OK, state.metrics_handle.render())
}
