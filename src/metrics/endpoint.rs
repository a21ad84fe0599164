use std::sync::atomic::{AtomicU64, Ordering};

use super::window::SampleWindow;

/// Aggregated statistics for one (method, path) pair.
///
/// Counters are independent atomics so updates for one endpoint never
/// contend with another endpoint's traffic; the only lock in the hot path
/// is the record's own latency window. Timestamps are milliseconds on the
/// processor's monotonic clock (elapsed since processor construction).
pub struct EndpointRecord {
    pub latency: SampleWindow,
    request_count: AtomicU64,
    success_count: AtomicU64,
    error_count: AtomicU64,
    last_request_ms: AtomicU64,
}

impl EndpointRecord {
    pub fn new(window_capacity: usize, now_ms: u64) -> Self {
        Self {
            latency: SampleWindow::new(window_capacity),
            request_count: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            last_request_ms: AtomicU64::new(now_ms),
        }
    }

    /// Apply one event: bump counters, stamp the clock, record latency.
    /// Returns true when the event was classified as a success.
    pub fn observe(&self, duration_ms: u64, success: bool, now_ms: u64) -> bool {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.last_request_ms.store(now_ms, Ordering::Relaxed);
        if success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.latency.push(duration_ms as f64);
        success
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Relaxed)
    }

    pub fn error_count(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Percentage of requests classified as errors; 0.0 before any traffic.
    pub fn error_rate(&self) -> f64 {
        let requests = self.request_count();
        if requests == 0 {
            return 0.0;
        }
        self.error_count() as f64 / requests as f64 * 100.0
    }

    pub fn last_request_ms(&self) -> u64 {
        self.last_request_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_splits_success_and_error() {
        let rec = EndpointRecord::new(16, 0);
        rec.observe(12, true, 5);
        rec.observe(30, false, 9);
        rec.observe(8, false, 14);

        assert_eq!(rec.request_count(), 3);
        assert_eq!(rec.success_count(), 1);
        assert_eq!(rec.error_count(), 2);
        assert_eq!(rec.last_request_ms(), 14);
        assert_eq!(rec.latency.size(), 3);
    }

    #[test]
    fn error_rate_guards_empty_record() {
        let rec = EndpointRecord::new(16, 0);
        assert_eq!(rec.error_rate(), 0.0);

        rec.observe(10, false, 1);
        rec.observe(10, true, 2);
        rec.observe(10, true, 3);
        rec.observe(10, true, 4);
        assert_eq!(rec.error_rate(), 25.0);
    }
}
