use axum::{extract::State, Json};
use std::sync::Arc;

use crate::metrics::processor::HealthReport;
use crate::AppState;

// ─── GET /health ─────────────────────────────────────────────────

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.processor.health())
}

// ─── GET /health/detailed ────────────────────────────────────────
/// The basic verdict plus a summary of the current aggregation state,
/// for operators who want one curl instead of two.

pub async fn health_detailed(
    State(state): State<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let health = state.processor.health();
    let snapshot = state.processor.snapshot();

    Json(serde_json::json!({
        "health": health,
        "metrics_summary": {
            "total_endpoints": snapshot.endpoints.len(),
            "global_stats": snapshot.global,
        },
    }))
}
