use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Ingestion ───────────────────────────────────────────
        .route("/metrics", post(handlers::ingest::submit_metric))
        // ── Queries ─────────────────────────────────────────────
        .route("/metrics/realtime", get(handlers::query::realtime_metrics))
        .route("/metrics/stream", get(handlers::query::stream_metrics))
        .route(
            "/metrics/endpoint/*key",
            get(handlers::query::endpoint_metrics),
        )
        // ── Health ──────────────────────────────────────────────
        .route("/health", get(handlers::health::health))
        .route("/health/detailed", get(handlers::health::health_detailed))
        // ── Simulator control ───────────────────────────────────
        .route(
            "/simulate/start",
            post(handlers::simulate::start_simulation),
        )
        .route("/simulate/stop", post(handlers::simulate::stop_simulation))
        .route(
            "/simulate/status",
            get(handlers::simulate::simulation_status),
        )
        // ── Admin ───────────────────────────────────────────────
        .route("/info", get(handlers::query::service_info))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(CorsLayer::permissive())
}
