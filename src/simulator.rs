use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::metrics::{MetricEvent, MetricsProcessor};

/// (method, path) pool the synthetic producers draw from.
static ROUTES: &[(&str, &str)] = &[
    ("GET", "/api/users/:id"),
    ("GET", "/api/products/:id"),
    ("GET", "/api/orders/:id"),
    ("POST", "/api/users"),
    ("POST", "/api/orders"),
    ("PUT", "/api/users/:id"),
    ("DELETE", "/api/sessions/:id"),
];

// ─── Public entry point ──────────────────────────────────────────

/// Spawns `concurrency` Tokio tasks that feed synthetic events into the
/// processor until the deadline or the `running` flag is set to false.
pub async fn run(
    running: Arc<AtomicBool>,
    processor: Arc<MetricsProcessor>,
    concurrency: u32,
    duration_secs: u64,
    error_pct: u8,
) {
    let deadline = Instant::now() + Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(concurrency as usize);

    for worker_id in 0..concurrency {
        let running = running.clone();
        let processor = processor.clone();

        handles.push(tokio::spawn(async move {
            worker(worker_id, running, processor, deadline, error_pct).await;
        }));
    }

    // Wait for all workers to finish
    for h in handles {
        let _ = h.await;
    }

    // Mark the simulation as finished
    running.store(false, Ordering::SeqCst);
}

// ─── Worker loop ─────────────────────────────────────────────────

async fn worker(
    id: u32,
    running: Arc<AtomicBool>,
    processor: Arc<MetricsProcessor>,
    deadline: Instant,
    error_pct: u8,
) {
    // Each worker gets its own deterministic RNG seeded uniquely.
    let mut rng = StdRng::seed_from_u64(1000 + id as u64);

    while running.load(Ordering::Relaxed) && Instant::now() < deadline {
        let event = synthesize(&mut rng, error_pct);

        if let Err(err) = processor.process_event(&event) {
            debug!(%err, "simulator produced a rejected event");
        }

        // Pace the producers so one worker does not saturate a core
        tokio::time::sleep(Duration::from_millis(rng.gen_range(1..=10))).await;
    }
}

// ─── Event synthesis ─────────────────────────────────────────────

fn synthesize(rng: &mut StdRng, error_pct: u8) -> MetricEvent {
    let (method, endpoint) = ROUTES[rng.gen_range(0..ROUTES.len())];

    // Mostly quick responses; roughly 1% cross the default alert
    // threshold so the anomaly path sees real traffic.
    let duration_ms = if rng.gen_bool(0.01) {
        rng.gen_range(5_000..=9_000)
    } else {
        rng.gen_range(3..=250)
    };

    let status = if rng.gen_range(0u8..100) < error_pct {
        ["500", "502", "503"][rng.gen_range(0..3)]
    } else {
        "200"
    };

    MetricEvent {
        endpoint: endpoint.into(),
        method: method.into(),
        duration_ms,
        status: status.into(),
        timestamp: chrono::Utc::now().timestamp(),
        trace_id: uuid::Uuid::new_v4().to_string(),
        service_name: "traffic-sim".into(),
        user_id: format!("usr_{:08}", rng.gen_range(1..=10_000u32)),
        ip_address: format!(
            "10.0.{}.{}",
            rng.gen_range(0u8..=255),
            rng.gen_range(1u8..=254)
        ),
    }
}
