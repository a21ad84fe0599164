pub mod health;
pub mod ingest;
pub mod query;
pub mod simulate;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::metrics::MetricsError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    BadRequest(String),
    AlreadyRunning,
}

impl From<MetricsError> for AppError {
    fn from(err: MetricsError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::AlreadyRunning => {
                (StatusCode::CONFLICT, "Simulation already running".into())
            }
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}
