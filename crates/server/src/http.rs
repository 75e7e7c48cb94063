//! HTTP/SSE endpoints (§6.1).

use std::convert::Infallible;

use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tone_core::progress::ProgressSink;
use tone_core::request::RewriteRequest;
use tone_pipeline::PipelineError;

use crate::metrics::{self, metrics_handler};
use crate::sse::ChannelSink;
use crate::state::AppState;

/// Builds the router: one rewrite route, plus the health/readiness/
/// metrics endpoints every service in this deployment carries.
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.settings.server.cors_origins, state.settings.server.cors_enabled);

    Router::new()
        .route("/api/v1/tone/rewrite", post(rewrite_handler))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// If CORS is disabled, allow everything (development only). If no
/// origins are configured, default to localhost for safety. Otherwise
/// restrict to the configured origins.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    if origins.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!(origin, "invalid CORS origin, skipping");
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::error!("all configured CORS origins are invalid, falling back to localhost");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
        .allow_credentials(true)
}

/// Streams one rewrite run as Server-Sent Events (§6). All pipeline
/// work runs inside one spawned task so the handler itself returns
/// immediately, the way `ptt.rs::handle_ptt_stream` does.
async fn rewrite_handler(
    State(state): State<AppState>,
    Json(request): Json<RewriteRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    metrics::record_request();
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(32);

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        let sink: std::sync::Arc<dyn ProgressSink> = std::sync::Arc::new(ChannelSink::new(tx.clone()));
        let cancel = CancellationToken::new();

        // Errors surfaced here are the ones the orchestrator never
        // turns into a `Failed` event itself (§7): a fatal stage
        // failure, a transient LLM error that exhausted its retries.
        // `Cancelled`/`WallClockExceeded` mean the caller is already
        // gone or past its budget, so nothing more is sent (§5).
        if let Err(err) = orchestrator.run(request, sink, cancel).await {
            match err {
                PipelineError::Cancelled | PipelineError::WallClockExceeded => {}
                other => {
                    let event = tone_core::progress::ProgressEvent::Failed { message: other.to_string() };
                    let data = serde_json::to_string(&event).unwrap_or_default();
                    let _ = tx.try_send(Ok(Event::default().data(data)));
                }
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Ready iff the configured `LLMClient` reports itself available
/// (§6.1) — a cheap local check, never a live network round-trip.
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.llm.is_available() {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "not_ready" })),
        )
    }
}
