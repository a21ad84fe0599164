use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{wrappers::IntervalStream, StreamExt};

use crate::metrics::processor::EndpointSummary;
use crate::metrics::MetricsSnapshot;
use crate::AppState;

use super::AppError;

// ─── GET /metrics/realtime ───────────────────────────────────────
/// One full snapshot as plain JSON — the curl/debugging view.

pub async fn realtime_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.processor.snapshot())
}

// ─── GET /metrics/stream ─────────────────────────────────────────

/// Cadence of the snapshot push; two updates a second keeps a
/// dashboard current without hammering the registry.
const STREAM_PERIOD: Duration = Duration::from_millis(500);

/// Server-Sent Events: the same snapshot as `/metrics/realtime`,
/// re-taken and pushed on every tick for as long as the consumer
/// stays connected.
pub async fn stream_metrics(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, axum::Error>>> {
    let mut ticks = tokio::time::interval(STREAM_PERIOD);
    // If a slow consumer makes us miss ticks, resume at the normal
    // cadence rather than bursting to catch up.
    ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let snapshots = IntervalStream::new(ticks)
        .map(move |_| Event::default().json_data(state.processor.snapshot()));

    Sse::new(snapshots).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

// ─── GET /metrics/endpoint/{key} ─────────────────────────────────
/// Statistics for a single endpoint key, e.g. `GET:/api/users/:id`.
/// The key is matched exactly — same composition the ingest path uses.

pub async fn endpoint_metrics(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Json<EndpointSummary>, AppError> {
    state
        .processor
        .endpoint_snapshot(&key)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("endpoint '{key}' not found")))
}

// ─── GET /info ───────────────────────────────────────────────────

pub async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Real-time metrics aggregation for microservice request telemetry",
        "endpoints": [
            "GET  /health - Basic health check",
            "GET  /health/detailed - Health plus aggregation summary",
            "POST /metrics - Submit one metric event",
            "GET  /metrics/realtime - Full snapshot",
            "GET  /metrics/stream - Snapshot pushed over SSE",
            "GET  /metrics/endpoint/{key} - One endpoint's statistics",
            "POST /simulate/start - Start synthetic traffic",
            "POST /simulate/stop - Stop synthetic traffic",
            "GET  /simulate/status - Simulator state",
            "GET  /info - This document",
        ],
    }))
}
