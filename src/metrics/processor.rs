use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::alerts::AlertSubscriber;
use super::endpoint::EndpointRecord;
use super::{MetricEvent, MetricsError};

// ─── Configuration ───────────────────────────────────────────────

/// Tuning supplied by the embedding process; the processor never reads
/// the environment itself.
#[derive(Debug, Clone, Copy)]
pub struct ProcessorConfig {
    /// A single request at or above this duration is anomalous.
    pub alert_threshold_ms: u64,
    /// Latency samples retained per endpoint.
    pub window_capacity: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            alert_threshold_ms: 5000,
            window_capacity: 1000,
        }
    }
}

// ─── Snapshot types ──────────────────────────────────────────────

/// Process-wide counters derived at query time.
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate: f64,
    pub uptime_seconds: u64,
    pub requests_per_second: f64,
}

/// Latency figures for one endpoint's current sample window.
#[derive(Debug, Clone, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub avg: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// One endpoint's block in the snapshot. `latency` is `null` until the
/// endpoint has recorded at least one sample.
#[derive(Debug, Clone, Serialize)]
pub struct EndpointSummary {
    pub endpoint: String,
    pub request_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub error_rate: f64,
    pub latency: Option<LatencySummary>,
    pub last_request_seconds_ago: u64,
}

/// Complete point-in-time read of the aggregation state.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub timestamp: i64,
    pub global: GlobalStats,
    pub endpoints: Vec<EndpointSummary>,
}

/// Verdict derived from the global error rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub uptime_seconds: u64,
    pub total_requests: u64,
    pub total_errors: u64,
    pub error_rate_percent: f64,
    pub endpoints_count: usize,
    pub service: &'static str,
    pub version: &'static str,
}

// ─── Processor ───────────────────────────────────────────────────

/// The aggregation engine. Ingest tasks call `process_event`, the query
/// layer calls `snapshot`/`health`, and both sides share state through
/// endpoint-scoped atomics — the registry lock only guards the key space.
pub struct MetricsProcessor {
    /// Keyed by `"<METHOD>:<PATH>"`. Entries are created on first sight
    /// and never removed; records sit behind `Arc` so readers and writers
    /// drop the map lock before touching them.
    endpoints: RwLock<HashMap<String, Arc<EndpointRecord>>>,

    total_requests: AtomicU64,
    total_errors: AtomicU64,
    start_time: Instant,

    subscribers: RwLock<Vec<Arc<dyn AlertSubscriber>>>,

    config: ProcessorConfig,
}

impl MetricsProcessor {
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig::default())
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            start_time: Instant::now(),
            subscribers: RwLock::new(Vec::new()),
            config,
        }
    }

    /// Milliseconds on the processor's monotonic clock.
    fn now_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    /// Ingest one event.
    ///
    /// Validation happens before any mutation, so a rejected event leaves
    /// every counter untouched. After the counters and the latency window
    /// are updated, the event is classified against the *post-update*
    /// state; on anomaly every registered subscriber runs synchronously,
    /// in registration order. The applied mutation is never rolled back,
    /// whatever the subscribers do.
    pub fn process_event(&self, event: &MetricEvent) -> Result<(), MetricsError> {
        event.validate()?;

        let key = event.key();
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let record = self.record_for(&key);
        let success = record.observe(event.duration_ms, event.is_success(), self.now_ms());
        if !success {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }

        if self.anomalous(&record, event) {
            warn!(
                endpoint = %key,
                duration_ms = event.duration_ms,
                status = %event.status,
                "anomaly detected"
            );
            self.dispatch_alerts(event);
        }

        debug!(
            endpoint = %key,
            duration_ms = event.duration_ms,
            status = %event.status,
            "processed metric event"
        );
        Ok(())
    }

    /// Fetch the record for `key`, creating it on first sight. The fast
    /// path is a read lock; the write lock re-checks so two racing
    /// first-observers cannot both insert.
    fn record_for(&self, key: &str) -> Arc<EndpointRecord> {
        if let Some(record) = self.endpoints.read().get(key) {
            return record.clone();
        }
        let mut map = self.endpoints.write();
        map.entry(key.to_owned())
            .or_insert_with(|| {
                Arc::new(EndpointRecord::new(self.config.window_capacity, self.now_ms()))
            })
            .clone()
    }

    /// Would this event be flagged right now? True when its duration
    /// reaches the alert threshold, or when its endpoint's error rate
    /// exceeds 20% with more than 10 requests on record (the minimum-
    /// sample guard keeps a brand-new endpoint from alerting after one
    /// failure). Error-rate state is whatever has already been applied —
    /// `process_event` calls this after the current event's counters land.
    pub fn is_anomaly(&self, event: &MetricEvent) -> bool {
        if event.duration_ms >= self.config.alert_threshold_ms {
            return true;
        }
        match self.endpoints.read().get(&event.key()) {
            Some(record) => record.request_count() > 10 && record.error_rate() > 20.0,
            None => false,
        }
    }

    /// Same rules as `is_anomaly`, against an already-resolved record.
    fn anomalous(&self, record: &EndpointRecord, event: &MetricEvent) -> bool {
        event.duration_ms >= self.config.alert_threshold_ms
            || (record.request_count() > 10 && record.error_rate() > 20.0)
    }

    /// Append a subscriber. No de-duplication, no removal — subscribers
    /// live for the process lifetime. They run inline on the ingesting
    /// task, so a blocking subscriber stalls that producer.
    pub fn register_alert_subscriber(&self, subscriber: Arc<dyn AlertSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Invoke every subscriber with the triggering event. A failing
    /// subscriber is logged and skipped; the rest still run and the
    /// ingest caller never sees the failure.
    fn dispatch_alerts(&self, event: &MetricEvent) {
        let subscribers: Vec<Arc<dyn AlertSubscriber>> = self.subscribers.read().clone();
        for subscriber in subscribers {
            if let Err(err) = subscriber.handle(event) {
                error!(subscriber = subscriber.name(), %err, "alert subscriber failed");
            }
        }
    }

    // ─── Queries ─────────────────────────────────────────────────

    fn global_stats(&self) -> GlobalStats {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_errors = self.total_errors.load(Ordering::Relaxed);
        let uptime_seconds = self.start_time.elapsed().as_secs();

        let error_rate = if total_requests > 0 {
            total_errors as f64 / total_requests as f64 * 100.0
        } else {
            0.0
        };
        let requests_per_second = if uptime_seconds > 0 {
            total_requests as f64 / uptime_seconds as f64
        } else {
            0.0
        };

        GlobalStats {
            total_requests,
            total_errors,
            error_rate,
            uptime_seconds,
            requests_per_second,
        }
    }

    fn summarize(&self, key: &str, record: &EndpointRecord) -> EndpointSummary {
        let window_size = record.latency.size();
        let latency = if window_size > 0 {
            Some(LatencySummary {
                count: window_size as u64,
                avg: record.latency.average(),
                p50: record.latency.percentile(0.5),
                p95: record.latency.percentile(0.95),
                p99: record.latency.percentile(0.99),
            })
        } else {
            None
        };

        EndpointSummary {
            endpoint: key.to_owned(),
            request_count: record.request_count(),
            success_count: record.success_count(),
            error_count: record.error_count(),
            error_rate: record.error_rate(),
            latency,
            last_request_seconds_ago: self
                .now_ms()
                .saturating_sub(record.last_request_ms())
                / 1000,
        }
    }

    /// Point-in-time read of the global counters plus every known
    /// endpoint. The registry lock is held only long enough to clone the
    /// record handles; each endpoint's figures are then read on their
    /// own, so an endpoint updated mid-pass may show a state from just
    /// before or after the snapshot's nominal instant. That relaxation
    /// is intentional — there is no cross-endpoint transaction.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let entries: Vec<(String, Arc<EndpointRecord>)> = {
            let map = self.endpoints.read();
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        MetricsSnapshot {
            timestamp: chrono::Utc::now().timestamp(),
            global: self.global_stats(),
            endpoints: entries
                .iter()
                .map(|(key, record)| self.summarize(key, record))
                .collect(),
        }
    }

    /// Snapshot block for a single endpoint key; `None` for unknown keys.
    pub fn endpoint_snapshot(&self, key: &str) -> Option<EndpointSummary> {
        let record = self.endpoints.read().get(key).cloned()?;
        Some(self.summarize(key, &record))
    }

    /// Health verdict from the global error rate: above 10% is critical,
    /// above 5% a warning, anything else healthy.
    pub fn health(&self) -> HealthReport {
        let global = self.global_stats();

        let status = if global.error_rate > 10.0 {
            HealthStatus::Critical
        } else if global.error_rate > 5.0 {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        };

        HealthReport {
            status,
            uptime_seconds: global.uptime_seconds,
            total_requests: global.total_requests,
            total_errors: global.total_errors,
            error_rate_percent: global.error_rate,
            endpoints_count: self.endpoints.read().len(),
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl Default for MetricsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::{FnSubscriber, SubscriberError};
    use parking_lot::Mutex;

    fn event(method: &str, endpoint: &str, duration_ms: u64, status: &str) -> MetricEvent {
        MetricEvent {
            endpoint: endpoint.into(),
            method: method.into(),
            duration_ms,
            status: status.into(),
            timestamp: 1_700_000_000,
            trace_id: String::new(),
            service_name: "unknown".into(),
            user_id: String::new(),
            ip_address: String::new(),
        }
    }

    /// Records every event it is handed.
    struct Recording {
        seen: Mutex<Vec<MetricEvent>>,
    }

    impl Recording {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl AlertSubscriber for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn handle(&self, event: &MetricEvent) -> Result<(), SubscriberError> {
            self.seen.lock().push(event.clone());
            Ok(())
        }
    }

    /// Always fails; used to prove isolation.
    struct Exploding;

    impl AlertSubscriber for Exploding {
        fn name(&self) -> &str {
            "exploding"
        }

        fn handle(&self, _event: &MetricEvent) -> Result<(), SubscriberError> {
            Err(SubscriberError::new("boom"))
        }
    }

    #[test]
    fn counts_every_accepted_event() {
        let p = MetricsProcessor::new();
        for _ in 0..7 {
            p.process_event(&event("GET", "/a", 10, "200")).unwrap();
        }
        for _ in 0..3 {
            p.process_event(&event("GET", "/a", 10, "500")).unwrap();
        }

        let snap = p.snapshot();
        assert_eq!(snap.global.total_requests, 10);
        assert_eq!(snap.global.total_errors, 3);
        assert_eq!(snap.global.error_rate, 30.0);
    }

    #[test]
    fn classification_is_literal_string_match() {
        let p = MetricsProcessor::new();
        p.process_event(&event("GET", "/x", 5, "200")).unwrap();
        p.process_event(&event("GET", "/x", 5, "success")).unwrap();
        // Semantically fine status codes still count as errors
        p.process_event(&event("GET", "/x", 5, "201")).unwrap();
        p.process_event(&event("GET", "/x", 5, "204")).unwrap();
        p.process_event(&event("GET", "/x", 5, "500")).unwrap();

        let summary = p.endpoint_snapshot("GET:/x").unwrap();
        assert_eq!(summary.request_count, 5);
        assert_eq!(summary.success_count, 2);
        assert_eq!(summary.error_count, 3);
    }

    #[test]
    fn rejects_incomplete_events_without_mutating() {
        let p = MetricsProcessor::new();

        let err = p.process_event(&event("GET", "", 10, "200")).unwrap_err();
        assert!(matches!(err, MetricsError::Validation("endpoint")));
        assert!(p
            .process_event(&event("", "/a", 10, "200"))
            .is_err());
        assert!(p.process_event(&event("GET", "/a", 10, "")).is_err());

        let snap = p.snapshot();
        assert_eq!(snap.global.total_requests, 0);
        assert!(snap.endpoints.is_empty());
    }

    #[test]
    fn events_with_same_key_share_a_record() {
        let p = MetricsProcessor::new();
        p.process_event(&event("GET", "/a", 10, "200")).unwrap();
        p.process_event(&event("GET", "/a", 20, "200")).unwrap();
        p.process_event(&event("POST", "/a", 30, "200")).unwrap();

        assert_eq!(p.endpoint_snapshot("GET:/a").unwrap().request_count, 2);
        assert_eq!(p.endpoint_snapshot("POST:/a").unwrap().request_count, 1);
        assert!(p.endpoint_snapshot("PUT:/a").is_none());
    }

    #[test]
    fn duration_at_threshold_is_anomalous() {
        let p = MetricsProcessor::new();
        let seen = Recording::new();
        p.register_alert_subscriber(seen.clone());

        // First-ever event, successful status — duration alone decides
        p.process_event(&event("GET", "/slow", 5000, "200")).unwrap();
        assert_eq!(seen.seen.lock().len(), 1);

        p.process_event(&event("GET", "/slow", 4999, "200")).unwrap();
        assert_eq!(seen.seen.lock().len(), 1);
    }

    #[test]
    fn error_rate_alone_never_fires_below_minimum_samples() {
        let p = MetricsProcessor::new();
        let seen = Recording::new();
        p.register_alert_subscriber(seen.clone());

        // 100% errors but only ten requests
        for _ in 0..10 {
            p.process_event(&event("GET", "/new", 10, "500")).unwrap();
        }
        assert!(seen.seen.lock().is_empty());

        // The eleventh crosses the guard
        p.process_event(&event("GET", "/new", 10, "500")).unwrap();
        assert_eq!(seen.seen.lock().len(), 1);
    }

    #[test]
    fn error_rate_anomaly_carries_the_triggering_event() {
        let p = MetricsProcessor::new();
        let seen = Recording::new();
        p.register_alert_subscriber(seen.clone());

        // 3 errors out of 11 → 27.3% on the eleventh event
        for i in 0..10 {
            let status = if i < 3 { "500" } else { "200" };
            p.process_event(&event("GET", "/a", 10, status)).unwrap();
        }
        assert!(seen.seen.lock().is_empty());

        p.process_event(&event("GET", "/a", 10, "200")).unwrap();

        let seen = seen.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].endpoint, "/a");
        assert_eq!(seen[0].status, "200");
    }

    #[test]
    fn failing_subscriber_does_not_block_the_rest() {
        let p = MetricsProcessor::new();
        let seen = Recording::new();
        p.register_alert_subscriber(Arc::new(Exploding));
        p.register_alert_subscriber(seen.clone());

        let result = p.process_event(&event("GET", "/slow", 9000, "200"));
        assert!(result.is_ok());
        assert_eq!(seen.seen.lock().len(), 1);

        // State survived the failure
        assert_eq!(p.snapshot().global.total_requests, 1);
    }

    #[test]
    fn closure_subscribers_register_too() {
        let p = MetricsProcessor::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        p.register_alert_subscriber(Arc::new(FnSubscriber::new("counter", move |_event: &MetricEvent| {
            counter.fetch_add(1, Ordering::Relaxed);
        })));

        p.process_event(&event("GET", "/slow", 6000, "200")).unwrap();
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn is_anomaly_reads_current_state() {
        let p = MetricsProcessor::new();
        assert!(p.is_anomaly(&event("GET", "/nowhere", 5000, "200")));
        assert!(!p.is_anomaly(&event("GET", "/nowhere", 10, "500")));

        for _ in 0..11 {
            p.process_event(&event("GET", "/bad", 10, "500")).unwrap();
        }
        assert!(p.is_anomaly(&event("GET", "/bad", 10, "200")));
    }

    #[test]
    fn health_cutoffs() {
        let critical = MetricsProcessor::new();
        for i in 0..100 {
            let status = if i < 12 { "500" } else { "200" };
            critical.process_event(&event("GET", "/h", 10, status)).unwrap();
        }
        assert_eq!(critical.health().status, HealthStatus::Critical);

        let warning = MetricsProcessor::new();
        for i in 0..100 {
            let status = if i < 6 { "500" } else { "200" };
            warning.process_event(&event("GET", "/h", 10, status)).unwrap();
        }
        assert_eq!(warning.health().status, HealthStatus::Warning);

        let healthy = MetricsProcessor::new();
        for i in 0..100 {
            let status = if i < 3 { "500" } else { "200" };
            healthy.process_event(&event("GET", "/h", 10, status)).unwrap();
        }
        let report = healthy.health();
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.total_requests, 100);
        assert_eq!(report.total_errors, 3);
        assert_eq!(report.endpoints_count, 1);
    }

    #[test]
    fn empty_processor_is_healthy_with_zero_rates() {
        let p = MetricsProcessor::new();
        let report = p.health();
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.error_rate_percent, 0.0);

        let snap = p.snapshot();
        assert_eq!(snap.global.error_rate, 0.0);
        assert_eq!(snap.global.requests_per_second, 0.0);
    }

    #[test]
    fn snapshot_summarizes_latency_per_endpoint() {
        let p = MetricsProcessor::new();
        for v in [10, 20, 30] {
            p.process_event(&event("GET", "/lat", v, "200")).unwrap();
        }

        let summary = p.endpoint_snapshot("GET:/lat").unwrap();
        let latency = summary.latency.unwrap();
        assert_eq!(latency.count, 3);
        assert_eq!(latency.avg, 20.0);
        assert_eq!(latency.p50, 20.0);
        assert_eq!(latency.p95, 20.0);
        assert_eq!(latency.p99, 20.0);
    }

    #[test]
    fn window_capacity_comes_from_config() {
        let p = MetricsProcessor::with_config(ProcessorConfig {
            alert_threshold_ms: 5000,
            window_capacity: 4,
        });
        for v in 1..=9u64 {
            p.process_event(&event("GET", "/w", v, "200")).unwrap();
        }

        let latency = p.endpoint_snapshot("GET:/w").unwrap().latency.unwrap();
        // Window kept 6, 7, 8, 9
        assert_eq!(latency.count, 4);
        assert_eq!(latency.avg, 7.5);
    }
}
