use crate::error::{PipelineError, Result};
use crate::metrics::StageMetrics;
use crate::queue::BoundedQueue;
use crate::stage::Transform;
use crossbeam::sync::WaitGroup;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Element of a pool's input queue
#[derive(Debug, Clone, PartialEq)]
pub enum Job<T> {
    /// Run the transform on this item
    Process(T),
    /// Poison pill: the worker that takes it exits
    Stop,
}

/// Element of a pool's output queue
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<U> {
    /// A transformed item
    Ready(U),
    /// The transform panicked on an item. The worker that caught the panic
    /// keeps running.
    Failed { message: String },
    /// Pushed by the producer once its source is exhausted, carrying the
    /// number of items it submitted
    EndOfInput { count: usize },
}

/// A fixed set of worker threads moving items from an input queue to an
/// output queue through a shared transform.
///
/// Workers block in `pop` while idle. They are stopped cooperatively by
/// [`WorkerPool::shutdown`], which sends one [`Job::Stop`] per worker; since
/// the input is FIFO every item submitted before shutdown is processed first.
pub struct WorkerPool<T> {
    name: String,
    input: Arc<BoundedQueue<Job<T>>>,
    handles: Vec<JoinHandle<()>>,
    metrics: StageMetrics,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start `workers` threads and return once all of them are running
    pub fn spawn<X>(
        name: &str,
        workers: usize,
        input: Arc<BoundedQueue<Job<T>>>,
        output: Arc<BoundedQueue<Outcome<X::Output>>>,
        transform: Arc<X>,
        metrics: StageMetrics,
    ) -> Result<Self>
    where
        X: Transform<T>,
    {
        if workers == 0 {
            return Err(PipelineError::ConfigError(
                "worker pool needs at least one worker".into(),
            ));
        }

        let mut pool = Self {
            name: name.to_string(),
            input,
            handles: Vec::with_capacity(workers),
            metrics,
        };

        let started = WaitGroup::new();
        for id in 0..workers {
            let worker = Worker {
                id,
                input: Arc::clone(&pool.input),
                output: Arc::clone(&output),
                transform: Arc::clone(&transform),
                metrics: pool.metrics.clone(),
            };
            let started = started.clone();

            let spawned = thread::Builder::new()
                .name(format!("{name}-worker-{id}"))
                .spawn(move || {
                    drop(started);
                    worker.run();
                });

            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    warn!(stage = %name, worker = id, error = %e, "failed to spawn worker");
                    // Stop whatever did start; the spawn error is what gets reported.
                    let _ = pool.stop_workers();
                    return Err(PipelineError::ThreadError(format!(
                        "failed to spawn worker {id} of {name}: {e}"
                    )));
                }
            }
        }
        started.wait();

        info!(
            stage = %name,
            workers,
            transform = transform.name(),
            "worker pool started"
        );
        Ok(pool)
    }

    /// Stop every worker after it finishes the items queued ahead of its
    /// poison pill, then join them
    pub fn shutdown(mut self) -> Result<()> {
        let workers = self.handles.len();
        self.stop_workers()?;
        info!(stage = %self.name, workers, "worker pool stopped");
        Ok(())
    }

    fn stop_workers(&mut self) -> Result<()> {
        let handles = std::mem::take(&mut self.handles);
        for _ in &handles {
            self.input.push(Job::Stop);
        }

        let mut panicked = 0;
        for handle in handles {
            if handle.join().is_err() {
                panicked += 1;
            }
        }

        if panicked > 0 {
            return Err(PipelineError::ShutdownError(format!(
                "{panicked} worker(s) of {} panicked",
                self.name
            )));
        }
        Ok(())
    }

    /// Number of running workers
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Get the stage name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the metrics shared by all workers
    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            warn!(
                stage = %self.name,
                workers = self.handles.len(),
                "worker pool dropped without shutdown, detaching workers"
            );
        }
    }
}

struct Worker<T, X: Transform<T>> {
    id: usize,
    input: Arc<BoundedQueue<Job<T>>>,
    output: Arc<BoundedQueue<Outcome<X::Output>>>,
    transform: Arc<X>,
    metrics: StageMetrics,
}

impl<T, X: Transform<T>> Worker<T, X> {
    fn run(self) {
        debug!(worker = self.id, "worker running");
        let mut handled = 0u64;

        loop {
            match self.input.pop() {
                Job::Process(item) => {
                    let start = Instant::now();
                    let applied =
                        panic::catch_unwind(AssertUnwindSafe(|| self.transform.apply(item)));
                    self.metrics.record_processed(start.elapsed());
                    handled += 1;

                    // Every item yields exactly one outcome, or the drain side never finishes.
                    let outcome = match applied {
                        Ok(result) => {
                            trace!(worker = self.id, handled, "item transformed");
                            Outcome::Ready(result)
                        }
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            error!(worker = self.id, %message, "transform panicked");
                            Outcome::Failed { message }
                        }
                    };
                    self.output.push(outcome);
                }
                Job::Stop => break,
            }
        }

        debug!(worker = self.id, handled, "worker exiting");
    }
}

/// Text of a panic payload, for payloads raised by `panic!` with a message
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
