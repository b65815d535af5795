use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of transform latencies kept for percentile estimates
const LATENCY_WINDOW: usize = 1024;

/// Sliding window of transform latencies, shared by all workers of a pool
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: Arc<Mutex<VecDeque<Duration>>>,
    window_size: usize,
}

impl LatencyWindow {
    /// Create a window retaining the most recent `window_size` samples
    pub fn new(window_size: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(VecDeque::with_capacity(window_size))),
            window_size: window_size.max(1),
        }
    }

    /// Record one latency, evicting the oldest when the window is full
    pub fn record(&self, latency: Duration) {
        let mut samples = self.samples.lock();
        if samples.len() >= self.window_size {
            samples.pop_front();
        }
        samples.push_back(latency);
    }

    /// Latency at quantile `q` (0.0..=1.0) in microseconds, 0.0 when empty
    pub fn quantile_us(&self, q: f64) -> f64 {
        let mut sorted: Vec<Duration> = self.samples.lock().iter().copied().collect();
        if sorted.is_empty() {
            return 0.0;
        }
        sorted.sort_unstable();

        let idx = ((sorted.len() as f64 * q.clamp(0.0, 1.0)).ceil() as usize).saturating_sub(1);
        sorted[idx].as_nanos() as f64 / 1000.0
    }

    /// Get the number of retained samples
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    /// Check whether no sample has been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }
}

/// Counters for one pipeline stage. Clones share the same counters, so a
/// copy can be handed to every worker thread.
#[derive(Debug, Clone)]
pub struct StageMetrics {
    processed: Arc<AtomicU64>,
    blocked_pushes: Arc<AtomicU64>,
    latency: LatencyWindow,
    started: Instant,
}

impl StageMetrics {
    /// Create a new metrics collector for a stage
    pub fn new() -> Self {
        Self {
            processed: Arc::new(AtomicU64::new(0)),
            blocked_pushes: Arc::new(AtomicU64::new(0)),
            latency: LatencyWindow::new(LATENCY_WINDOW),
            started: Instant::now(),
        }
    }

    /// Record one item run through the transform
    pub fn record_processed(&self, latency: Duration) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        self.latency.record(latency);
    }

    /// Add backpressure events observed on the stage's queues
    pub fn record_blocked_pushes(&self, count: u64) {
        self.blocked_pushes.fetch_add(count, Ordering::Relaxed);
    }

    /// Get the total number of items processed
    pub fn total_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Get the total number of pushes that waited for a free slot
    pub fn total_blocked_pushes(&self) -> u64 {
        self.blocked_pushes.load(Ordering::Relaxed)
    }

    /// Items per second since the metrics were created
    pub fn throughput(&self) -> f64 {
        let elapsed = self.started.elapsed().as_secs_f64();
        if elapsed == 0.0 {
            0.0
        } else {
            self.total_processed() as f64 / elapsed
        }
    }

    /// Get the transform latency window
    pub fn latency(&self) -> &LatencyWindow {
        &self.latency
    }

    /// Get a snapshot of current metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            processed: self.total_processed(),
            blocked_pushes: self.total_blocked_pushes(),
            throughput: self.throughput(),
            latency_p50_us: self.latency.quantile_us(0.50),
            latency_p99_us: self.latency.quantile_us(0.99),
            elapsed: self.started.elapsed(),
        }
    }
}

impl Default for StageMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a stage's metrics
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub blocked_pushes: u64,
    pub throughput: f64,
    pub latency_p50_us: f64,
    pub latency_p99_us: f64,
    pub elapsed: Duration,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed={} blocked_pushes={} throughput={:.2}/s p50={:.2}µs p99={:.2}µs elapsed={:.3}s",
            self.processed,
            self.blocked_pushes,
            self.throughput,
            self.latency_p50_us,
            self.latency_p99_us,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_window_quantiles() {
        let window = LatencyWindow::new(10);
        for i in 1..=10 {
            window.record(Duration::from_micros(i));
        }
        assert_eq!(window.quantile_us(0.5), 5.0);
        assert_eq!(window.quantile_us(1.0), 10.0);
        assert!(window.quantile_us(0.99) >= window.quantile_us(0.5));
    }

    #[test]
    fn test_latency_window_evicts_oldest() {
        let window = LatencyWindow::new(3);
        for i in 1..=5 {
            window.record(Duration::from_micros(i * 100));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.quantile_us(0.0), 300.0);
    }

    #[test]
    fn test_empty_window_reports_zero() {
        let window = LatencyWindow::new(4);
        assert!(window.is_empty());
        assert_eq!(window.quantile_us(0.5), 0.0);
    }

    #[test]
    fn test_stage_metrics_shared_between_clones() {
        let metrics = StageMetrics::new();
        let worker_copy = metrics.clone();
        for _ in 0..100 {
            worker_copy.record_processed(Duration::from_micros(1));
        }
        metrics.record_blocked_pushes(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.processed, 100);
        assert_eq!(snapshot.blocked_pushes, 3);
        assert!(snapshot.to_string().starts_with("processed=100"));
    }
}
