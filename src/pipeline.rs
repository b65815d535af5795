use crate::error::{PipelineError, Result};
use crate::metrics::{MetricsSnapshot, StageMetrics};
use crate::pool::{Job, Outcome, WorkerPool};
use crate::queue::BoundedQueue;
use crate::stage::Transform;
use std::any::Any;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

/// Sizing of one pipeline stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Stage name, used for worker thread names and log fields
    pub name: String,
    /// Number of worker threads
    pub workers: usize,
    /// Capacity of the queue feeding the workers
    pub input_capacity: usize,
    /// Capacity of the queue the workers deliver into
    pub output_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "stage".to_string(),
            workers: 3,
            input_capacity: 16,
            output_capacity: 16,
        }
    }
}

impl PipelineConfig {
    /// Check that the stage can run with this sizing
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::ConfigError("stage name is empty".into()));
        }
        if self.workers == 0 {
            return Err(PipelineError::ConfigError(
                "stage needs at least one worker".into(),
            ));
        }
        if self.input_capacity == 0 || self.output_capacity == 0 {
            return Err(PipelineError::ConfigError(
                "queue capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a pipeline stage
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
}

impl PipelineBuilder {
    /// Create a builder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder starting from an existing configuration
    pub fn from_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Set the stage name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the number of worker threads
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set both queue capacities
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.input_capacity = capacity;
        self.config.output_capacity = capacity;
        self
    }

    /// Set the capacity of the queue feeding the workers
    pub fn input_capacity(mut self, capacity: usize) -> Self {
        self.config.input_capacity = capacity;
        self
    }

    /// Set the capacity of the queue the workers deliver into
    pub fn output_capacity(mut self, capacity: usize) -> Self {
        self.config.output_capacity = capacity;
        self
    }

    /// Validate the configuration and bind the transform
    pub fn build<T, X>(self, transform: X) -> Result<Pipeline<T, X>>
    where
        T: Send + 'static,
        X: Transform<T>,
    {
        self.config.validate()?;
        Ok(Pipeline {
            config: self.config,
            transform: Arc::new(transform),
            _input: PhantomData,
        })
    }
}

/// Totals for one completed run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Items taken from the source
    pub items_in: usize,
    /// Items delivered to the sink
    pub items_out: usize,
    pub metrics: MetricsSnapshot,
}

/// A stage that fans items out to a worker pool and collects the results.
///
/// Each call to [`Pipeline::run`] builds its own queues and pool and tears
/// them down before returning, so a `Pipeline` can be run repeatedly.
/// Results are delivered in completion order, which need not match the
/// source order when more than one worker is configured.
pub struct Pipeline<T, X> {
    config: PipelineConfig,
    transform: Arc<X>,
    _input: PhantomData<fn(T)>,
}

impl<T, X> Pipeline<T, X>
where
    T: Send + 'static,
    X: Transform<T>,
{
    /// Get the stage configuration
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Feed every item of `source` through the workers and hand each result
    /// to `sink`.
    ///
    /// The source is consumed on a separate thread while the calling thread
    /// drains, so bounded queues never deadlock regardless of input length.
    /// Draining stops after exactly as many results as items were submitted.
    ///
    /// A source error stops ingestion; results for items already submitted
    /// are still delivered before the error is returned. A sink error is
    /// returned after the remaining results have been drained and discarded.
    /// A panicking transform costs only its own item: the other results are
    /// delivered and the run returns [`PipelineError::TransformPanicked`].
    /// A panicking sink is resumed on the caller once the stage is torn down.
    pub fn run<I, S>(&self, source: I, mut sink: S) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: Send,
        S: FnMut(X::Output) -> Result<()>,
    {
        let input = Arc::new(BoundedQueue::new(self.config.input_capacity));
        let output = Arc::new(BoundedQueue::new(self.config.output_capacity));
        let metrics = StageMetrics::new();

        let pool = WorkerPool::spawn(
            &self.config.name,
            self.config.workers,
            Arc::clone(&input),
            Arc::clone(&output),
            Arc::clone(&self.transform),
            metrics.clone(),
        )?;

        let source = source.into_iter();
        let (ingested, drained) = thread::scope(|scope| {
            let producer = scope.spawn(|| ingest(source, &input, &output));
            let drained = drain(&output, &mut sink);
            (producer.join(), drained)
        });

        metrics.record_blocked_pushes(input.blocked_pushes() + output.blocked_pushes());
        pool.shutdown()?;

        // The stage is torn down; hand a sink panic back to the caller as is.
        if let Some(payload) = drained.sink_panic {
            panic::resume_unwind(payload);
        }

        let (items_in, ingest_result) = ingested
            .map_err(|_| PipelineError::ThreadError("source thread panicked".into()))?;
        ingest_result?;
        if let Some(message) = drained.first_failure {
            return Err(PipelineError::TransformPanicked {
                failed: drained.failed,
                message,
            });
        }
        drained.sink_result?;
        let items_out = drained.delivered;

        let summary = RunSummary {
            items_in,
            items_out,
            metrics: metrics.snapshot(),
        };
        info!(
            stage = %self.config.name,
            items_in,
            items_out,
            metrics = %summary.metrics,
            "run complete"
        );
        Ok(summary)
    }

    /// Run `items` through the stage and collect the results
    pub fn process<I>(&self, items: I) -> Result<Vec<X::Output>>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send,
    {
        let mut results = Vec::new();
        self.run(items.into_iter().map(Ok), |value| {
            results.push(value);
            Ok(())
        })?;
        Ok(results)
    }
}

/// Announces the submitted count on the output queue when dropped, so the
/// drain side terminates even if the source panics mid-iteration.
struct EndOfInputMarker<'a, U> {
    output: &'a BoundedQueue<Outcome<U>>,
    count: usize,
}

impl<U> Drop for EndOfInputMarker<'_, U> {
    fn drop(&mut self) {
        self.output.push(Outcome::EndOfInput { count: self.count });
    }
}

fn ingest<T, U, I>(
    source: I,
    input: &BoundedQueue<Job<T>>,
    output: &BoundedQueue<Outcome<U>>,
) -> (usize, Result<()>)
where
    I: Iterator<Item = Result<T>>,
{
    let mut marker = EndOfInputMarker { output, count: 0 };
    for item in source {
        match item {
            Ok(item) => {
                input.push(Job::Process(item));
                marker.count += 1;
            }
            Err(e) => {
                warn!(submitted = marker.count, error = %e, "source failed, stopping ingest");
                return (marker.count, Err(e));
            }
        }
    }
    (marker.count, Ok(()))
}

/// What the drain side saw before the expected count was reached
struct Drained {
    delivered: usize,
    failed: usize,
    first_failure: Option<String>,
    sink_result: Result<()>,
    sink_panic: Option<Box<dyn Any + Send>>,
}

fn drain<U, S>(output: &BoundedQueue<Outcome<U>>, sink: &mut S) -> Drained
where
    S: FnMut(U) -> Result<()>,
{
    let mut report = Drained {
        delivered: 0,
        failed: 0,
        first_failure: None,
        sink_result: Ok(()),
        sink_panic: None,
    };
    let mut expected = None;

    while expected != Some(report.delivered + report.failed) {
        match output.pop() {
            Outcome::Ready(value) => {
                report.delivered += 1;
                if report.sink_result.is_err() || report.sink_panic.is_some() {
                    continue;
                }
                match panic::catch_unwind(AssertUnwindSafe(|| sink(value))) {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!(error = %e, "sink failed, discarding remaining results");
                        report.sink_result = Err(e);
                    }
                    Err(payload) => {
                        warn!("sink panicked, discarding remaining results");
                        report.sink_panic = Some(payload);
                    }
                }
            }
            Outcome::Failed { message } => {
                report.failed += 1;
                report.first_failure.get_or_insert(message);
            }
            Outcome::EndOfInput { count } => {
                let seen = report.delivered + report.failed;
                assert!(
                    count >= seen,
                    "drained {seen} outcomes but only {count} items were submitted"
                );
                expected = Some(count);
            }
        }
    }
    report
}
