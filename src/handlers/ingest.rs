use axum::extract::rejection::JsonRejection;
use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::MetricEvent;
use crate::AppState;

use super::AppError;

#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub success: bool,
    pub message: String,
}

// ─── POST /metrics ───────────────────────────────────────────────
/// Accepts one request-completion event from a producer. Missing or
/// malformed required fields never reach the aggregates: a body the
/// extractor cannot decode is mapped to the same 400 shape as a core
/// validation failure, instead of axum's default 422.

pub async fn submit_metric(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MetricEvent>, JsonRejection>,
) -> Result<Json<IngestAck>, AppError> {
    let Json(event) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    state.processor.process_event(&event)?;

    Ok(Json(IngestAck {
        success: true,
        message: "Metric processed successfully".into(),
    }))
}
