pub mod alerts;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod server;
pub mod simulator;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use metrics::MetricsProcessor;

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    /// The aggregation engine — ingest pushes events, queries read snapshots.
    pub processor: Arc<MetricsProcessor>,

    /// Flag checked by every simulator worker on each iteration.
    pub sim_running: Arc<AtomicBool>,

    /// Handle to the spawned simulator task so we can await clean shutdown.
    pub sim_handle: tokio::sync::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl AppState {
    pub fn new(processor: Arc<MetricsProcessor>) -> Self {
        Self {
            processor,
            sim_running: Arc::new(AtomicBool::new(false)),
            sim_handle: tokio::sync::Mutex::new(None),
        }
    }
}
