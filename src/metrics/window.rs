use parking_lot::Mutex;

/// Bounded sliding window of recent latency samples for one endpoint.
///
/// Holds the most recent `capacity` values in arrival order; once full,
/// each push overwrites the oldest slot. Producers call `push()`, the
/// snapshot path calls the query methods — both sides go through one
/// mutex, so a query always sees a consistent set of samples, never a
/// half-applied push.
pub struct SampleWindow {
    inner: Mutex<Ring>,
}

struct Ring {
    buf: Vec<f64>,
    /// Next slot to write (wraps at capacity)
    head: usize,
    /// Occupied count, grows until it reaches capacity and stays there
    count: usize,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Ring {
                buf: vec![0.0; capacity],
                head: 0,
                count: 0,
            }),
        }
    }

    /// Append one sample, evicting the oldest when the window is full. O(1).
    pub fn push(&self, value: f64) {
        let mut ring = self.inner.lock();
        let capacity = ring.buf.len();
        let head = ring.head;
        ring.buf[head] = value;
        ring.head = (head + 1) % capacity;
        if ring.count < capacity {
            ring.count += 1;
        }
    }

    /// Copy of the currently held samples, ascending. The copy happens in
    /// one critical section; the sort runs after the lock is released.
    fn sorted_values(&self) -> Vec<f64> {
        let mut values = {
            let ring = self.inner.lock();
            let capacity = ring.buf.len();
            let mut out = Vec::with_capacity(ring.count);
            for i in 0..ring.count {
                let idx = (ring.head + capacity - ring.count + i) % capacity;
                out.push(ring.buf[idx]);
            }
            out
        };
        values.sort_by(f64::total_cmp);
        values
    }

    /// Nearest-rank percentile: the value at rank `floor(p * (n-1))` of the
    /// sorted samples. No interpolation between adjacent ranks. `p` is a
    /// fraction in [0, 1]; returns 0.0 on an empty window.
    pub fn percentile(&self, p: f64) -> f64 {
        let values = self.sorted_values();
        if values.is_empty() {
            return 0.0;
        }
        let index = (p * (values.len() - 1) as f64) as usize;
        values[index]
    }

    /// Arithmetic mean of the held samples; 0.0 on an empty window.
    pub fn average(&self) -> f64 {
        let ring = self.inner.lock();
        if ring.count == 0 {
            return 0.0;
        }
        let capacity = ring.buf.len();
        let mut sum = 0.0;
        for i in 0..ring.count {
            let idx = (ring.head + capacity - ring.count + i) % capacity;
            sum += ring.buf[idx];
        }
        sum / ring.count as f64
    }

    /// Current occupied count (≤ capacity).
    pub fn size(&self) -> usize {
        self.inner.lock().count
    }
}
