//! Building blocks for a toy AM radio chain of independent programs,
//! `transmitter | channel | receiver`, exchanging samples as text.
//!
//! The receiver fans samples out to a fixed pool of worker threads. Its
//! queues are [`BoundedQueue`]s: FIFO, capacity limited, blocking on full and
//! empty without spinning. Workers are stopped with poison pills, and the
//! driver knows it has drained everything by counting, never by asking
//! whether a queue is empty.
//!
//! # Example
//!
//! ```
//! use radio_pipeline::{EnvelopeDetector, PipelineBuilder};
//!
//! let pipeline = PipelineBuilder::new()
//!     .name("receiver")
//!     .workers(3)
//!     .capacity(2)
//!     .build(EnvelopeDetector::new())?;
//!
//! let mut envelope = pipeline.process(vec![1.0, -2.0, 3.0, -4.0, 5.0])?;
//! envelope.sort_by(f32::total_cmp);
//! assert_eq!(envelope, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
//! # Ok::<(), radio_pipeline::PipelineError>(())
//! ```

pub mod channel;
pub mod codec;
pub mod demod;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod semaphore;
pub mod stage;
pub mod telemetry;

// Re-exports for convenience
pub use channel::{GaussianNoise, NoiseConfig};
pub use codec::{write_sample, SampleReader};
pub use demod::EnvelopeDetector;
pub use error::{PipelineError, Result};
pub use metrics::{MetricsSnapshot, StageMetrics};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig, RunSummary};
pub use pool::{Job, Outcome, WorkerPool};
pub use queue::BoundedQueue;
pub use stage::{MapTransform, Transform};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
