use crate::stage::Transform;
use std::thread;
use std::time::Duration;

/// Envelope detection for an AM signal: rectify each sample.
///
/// `latency` stands in for the cost of a real detector and is slept once per
/// sample, which is what makes a worker pool worthwhile here.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeDetector {
    latency: Duration,
}

impl EnvelopeDetector {
    /// Create a detector with no simulated latency
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detector that sleeps `latency` per sample
    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }

    /// Get the simulated per-sample latency
    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl Transform<f32> for EnvelopeDetector {
    type Output = f32;

    fn apply(&self, sample: f32) -> f32 {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        sample.abs()
    }

    fn name(&self) -> &str {
        "envelope"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_rectifies() {
        let detector = EnvelopeDetector::new();
        assert_eq!(detector.apply(-3.5), 3.5);
        assert_eq!(detector.apply(2.0), 2.0);
        assert_eq!(detector.apply(-0.0), 0.0);
    }

    #[test]
    fn test_simulated_latency() {
        let detector = EnvelopeDetector::with_latency(Duration::from_millis(10));
        let start = Instant::now();
        assert_eq!(detector.apply(-1.0), 1.0);
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
