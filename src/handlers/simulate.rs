use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::AppState;

use super::AppError;

// ─── Request / response types ────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SimulatorConfig {
    /// Number of concurrent Tokio tasks generating events
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// How long the simulation runs (seconds)
    #[serde(default = "default_duration")]
    pub duration_secs: u64,

    /// Percentage of generated events that report an error status (0–100)
    #[serde(default = "default_error_pct")]
    pub error_pct: u8,
}

fn default_concurrency() -> u32 {
    10
}
fn default_duration() -> u64 {
    30
}
fn default_error_pct() -> u8 {
    5
}

#[derive(Debug, Serialize)]
pub struct SimulatorStatus {
    pub running: bool,
    pub message: String,
}

// ─── POST /simulate/start ────────────────────────────────────────

pub async fn start_simulation(
    State(state): State<Arc<AppState>>,
    Json(config): Json<SimulatorConfig>,
) -> Result<Json<SimulatorStatus>, AppError> {
    // Guard: only one simulation at a time
    if state.sim_running.swap(true, Ordering::SeqCst) {
        return Err(AppError::AlreadyRunning);
    }

    // Validate inputs
    if config.concurrency == 0 || config.concurrency > 500 {
        state.sim_running.store(false, Ordering::SeqCst);
        return Err(AppError::BadRequest(
            "concurrency must be between 1 and 500".into(),
        ));
    }
    if config.duration_secs == 0 || config.duration_secs > 300 {
        state.sim_running.store(false, Ordering::SeqCst);
        return Err(AppError::BadRequest(
            "duration_secs must be between 1 and 300".into(),
        ));
    }
    if config.error_pct > 100 {
        state.sim_running.store(false, Ordering::SeqCst);
        return Err(AppError::BadRequest(
            "error_pct must be between 0 and 100".into(),
        ));
    }

    let msg = format!(
        "Started: {} workers × {}s, {}% errors",
        config.concurrency, config.duration_secs, config.error_pct,
    );

    // Capture clones for the spawned task
    let running = state.sim_running.clone();
    let processor = state.processor.clone();
    let concurrency = config.concurrency;
    let duration_secs = config.duration_secs;
    let error_pct = config.error_pct;

    let handle = tokio::spawn(async move {
        crate::simulator::run(running, processor, concurrency, duration_secs, error_pct)
            .await;
    });

    // Stash the handle so `stop` can await clean shutdown
    let mut guard = state.sim_handle.lock().await;
    *guard = Some(handle);

    Ok(Json(SimulatorStatus {
        running: true,
        message: msg,
    }))
}

// ─── POST /simulate/stop ─────────────────────────────────────────

pub async fn stop_simulation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SimulatorStatus>, AppError> {
    if !state.sim_running.load(Ordering::SeqCst) {
        return Ok(Json(SimulatorStatus {
            running: false,
            message: "No simulation is running".into(),
        }));
    }

    // Signal all workers to stop
    state.sim_running.store(false, Ordering::SeqCst);

    // Await the generator task so we know it's fully stopped
    let mut guard = state.sim_handle.lock().await;
    if let Some(handle) = guard.take() {
        // Ignore JoinError — the task may have already finished
        let _ = handle.await;
    }

    Ok(Json(SimulatorStatus {
        running: false,
        message: "Simulation stopped".into(),
    }))
}

// ─── GET /simulate/status ────────────────────────────────────────

pub async fn simulation_status(
    State(state): State<Arc<AppState>>,
) -> Json<SimulatorStatus> {
    let running = state.sim_running.load(Ordering::SeqCst);
    Json(SimulatorStatus {
        running,
        message: if running {
            "Simulation in progress".into()
        } else {
            "Idle".into()
        },
    })
}
