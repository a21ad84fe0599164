use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use telemetry_observatory::{alerts, config::Config, metrics, server, AppState};

#[tokio::main]
async fn main() {
    println!();
    println!("╔══════════════════════════════════════════════════╗");
    println!("║   📡  REQUEST TELEMETRY OBSERVATORY              ║");
    println!("╚══════════════════════════════════════════════════╝");
    println!();

    // ── 1. Configuration + logging ───────────────────────────────
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        port = config.port,
        log_level = %config.log_level,
        alert_threshold_ms = config.alert_threshold_ms,
        window_capacity = config.window_capacity,
        "starting telemetry observatory"
    );

    // ── 2. Build the aggregation core ────────────────────────────
    let processor = Arc::new(metrics::MetricsProcessor::with_config(config.processor()));

    if config.enable_alerts {
        alerts::setup_default_subscribers(&processor);
    }

    // ── 3. Build shared state + Axum router ──────────────────────
    let state = Arc::new(AppState::new(processor));
    let app = server::create_router(state);

    // ── 4. Bind & serve ──────────────────────────────────────────
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    println!("Server listening on http://localhost:{}", config.port);
    println!("Ingest          → POST http://localhost:{}/metrics", config.port);
    println!("Snapshot JSON   → http://localhost:{}/metrics/realtime", config.port);
    println!("Snapshot SSE    → http://localhost:{}/metrics/stream", config.port);
    println!("Health check    → http://localhost:{}/health", config.port);
    println!();

    axum::serve(listener, app)
        .await
        .expect("Server exited with error");
}
