//! Bounded-parallel execution of a work list.
//!
//! A run chunks the operations once, queues every batch, and starts one
//! worker per session slot. Each worker pulls batches until the queue is
//! empty, sending them through its own session and counting the outcomes.
//! Partial failure never fails the run; it only shows up in the counts.

use crate::aggregator::{ProgressCounter, ProgressObserver, ResultAggregator};
use crate::chunker::{Batch, chunk};
use crate::client::RemoteClient;
use crate::error::EngineError;
use crate::model::{Operation, Record, RecordRef, RunSummary};
use crate::session_pool::SessionPool;
use crate::submitter::{BatchSubmitter, RetryPolicy};
use crate::taskpool::TaskPool;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle of a run. `Completed` is the only terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Configured, not running.
    Idle,
    /// Batches are queued and being taken by workers.
    Dispatching,
    /// Every batch was taken (or the run was cancelled); waiting for
    /// in-flight batches.
    Draining,
    Completed,
}

/// Knobs for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub batch_size: usize,
    pub max_concurrent_sessions: usize,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_concurrent_sessions: 10,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(batch_size: usize, max_concurrent_sessions: usize) -> Self {
        Self {
            batch_size,
            max_concurrent_sessions,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry = RetryPolicy { max_attempts };
        self
    }

    /// Checks the settings before anything is dispatched.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.batch_size == 0 {
            return Err(EngineError::invalid(
                "batch_size",
                "must be greater than zero",
            ));
        }
        if self.max_concurrent_sessions == 0 {
            return Err(EngineError::invalid(
                "max_concurrent_sessions",
                "must be greater than zero",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(EngineError::invalid(
                "max_attempts",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Runs work lists against a [`RemoteClient`] with bounded concurrency,
/// retries and per-operation progress.
///
/// # Examples
///
/// ```no_run
/// use engine::{BatchExecutionEngine, EngineConfig, Progress};
/// use engine::simulator::SimulatedService;
/// use std::sync::Arc;
///
/// # async fn example(ops: Vec<engine::Operation>) -> Result<(), engine::EngineError> {
/// let service = SimulatedService::new(Default::default());
/// let engine = BatchExecutionEngine::new(service.client(), EngineConfig::new(10, 4));
/// let summary = engine
///     .run(ops, Arc::new(|p: Progress| println!("{p}")))
///     .await?;
/// println!("{} failed", summary.progress.fail_count);
/// # Ok(())
/// # }
/// ```
pub struct BatchExecutionEngine<C: RemoteClient> {
    client: Arc<C>,
    config: EngineConfig,
    state: Arc<watch::Sender<EngineState>>,
}

impl<C: RemoteClient> BatchExecutionEngine<C> {
    pub fn new(client: C, config: EngineConfig) -> Self {
        Self::from_shared(Arc::new(client), config)
    }

    pub fn from_shared(client: Arc<C>, config: EngineConfig) -> Self {
        let (state, _) = watch::channel(EngineState::Idle);
        Self {
            client,
            config,
            state: Arc::new(state),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    pub async fn create_multiple(
        &self,
        records: Vec<Record>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<RunSummary, EngineError> {
        let operations = records.into_iter().map(Operation::Create).collect();
        self.run(operations, observer).await
    }

    pub async fn update_multiple(
        &self,
        records: Vec<Record>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<RunSummary, EngineError> {
        let operations = records.into_iter().map(Operation::Update).collect();
        self.run(operations, observer).await
    }

    pub async fn delete_multiple(
        &self,
        targets: Vec<RecordRef>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<RunSummary, EngineError> {
        let operations = targets.into_iter().map(Operation::Delete).collect();
        self.run(operations, observer).await
    }

    pub async fn execute_multiple(
        &self,
        operations: Vec<Operation>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<RunSummary, EngineError> {
        self.run(operations, observer).await
    }

    /// Executes `operations` to completion.
    ///
    /// # Errors
    ///
    /// Only configuration errors and worker panics are returned; failed
    /// operations are reported through the observer and the summary.
    pub async fn run(
        &self,
        operations: Vec<Operation>,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<RunSummary, EngineError> {
        self.run_with_cancel(operations, observer, CancellationToken::new())
            .await
    }

    /// Like [`run`](Self::run), but stops taking new batches once `cancel`
    /// fires. Batches already in flight finish and are counted.
    pub async fn run_with_cancel(
        &self,
        operations: Vec<Operation>,
        observer: Arc<dyn ProgressObserver>,
        cancel: CancellationToken,
    ) -> Result<RunSummary, EngineError> {
        self.config.validate()?;
        if operations.len() > u32::MAX as usize {
            return Err(EngineError::invalid(
                "operations",
                format!("exceed the per-run limit of {}", u32::MAX),
            ));
        }
        self.state.send_replace(EngineState::Idle);

        let started = Instant::now();
        let total = operations.len();
        let batches = chunk(operations, self.config.batch_size)?;
        if batches.is_empty() {
            log::info!("No operations to execute");
            self.state.send_replace(EngineState::Completed);
            return Ok(RunSummary::empty());
        }

        let batch_count = batches.len();
        let workers = self.config.max_concurrent_sessions.min(batch_count);
        log::info!(
            "Executing {} operations in {} batches of up to {} across {} sessions",
            total,
            batch_count,
            self.config.batch_size,
            workers
        );

        let (queue_tx, queue) = flume::unbounded();
        for batch in batches {
            // The receiver is held right here, so sending cannot fail.
            let _ = queue_tx.send(batch);
        }
        drop(queue_tx);

        let counter = Arc::new(ProgressCounter::new(total));
        let context = Arc::new(WorkerContext {
            sessions: SessionPool::new(self.client.clone(), workers),
            submitter: BatchSubmitter::new(self.config.retry),
            aggregator: ResultAggregator::new(counter.clone(), observer),
            queue,
            state: self.state.clone(),
        });

        self.state.send_replace(EngineState::Dispatching);
        let pool = TaskPool::with_cancel_token(workers, cancel.child_token());
        let handles: Vec<_> = (0..workers)
            .map(|worker| pool.execute(work(worker, context.clone(), pool.cancel_token())))
            .collect();

        let joined = futures::future::join_all(handles).await;
        for (worker, result) in joined.into_iter().enumerate() {
            if let Err(e) = result {
                self.state.send_replace(EngineState::Completed);
                return Err(EngineError::WorkerPanicked {
                    worker,
                    reason: e.to_string(),
                });
            }
        }
        drop(pool);

        let cancelled = !context.queue.is_empty();
        let summary = RunSummary {
            progress: counter.snapshot(),
            batches: batch_count,
            sessions_created: context.sessions.sessions_created(),
            cancelled,
            elapsed: started.elapsed(),
        };
        drop(context);
        self.state.send_replace(EngineState::Completed);

        if cancelled {
            log::warn!(
                "Run cancelled with {} operations not dispatched ({} succeeded, {} failed)",
                summary.progress.remaining(),
                summary.progress.success_count,
                summary.progress.fail_count
            );
        } else {
            log::info!(
                "Run completed in {:?}: {} succeeded, {} failed",
                summary.elapsed,
                summary.progress.success_count,
                summary.progress.fail_count
            );
        }
        Ok(summary)
    }
}

/// Everything the workers of one run share.
struct WorkerContext<C: RemoteClient> {
    sessions: SessionPool<C>,
    submitter: BatchSubmitter,
    aggregator: ResultAggregator,
    queue: flume::Receiver<Batch>,
    state: Arc<watch::Sender<EngineState>>,
}

impl<C: RemoteClient> WorkerContext<C> {
    fn enter_draining(&self) {
        self.state.send_if_modified(|state| {
            if *state == EngineState::Dispatching {
                *state = EngineState::Draining;
                true
            } else {
                false
            }
        });
    }
}

/// Worker loop: take a batch, submit it through this worker's session,
/// count its outcomes. Returns the number of batches processed.
async fn work<C: RemoteClient>(
    worker: usize,
    context: Arc<WorkerContext<C>>,
    cancel: CancellationToken,
) -> usize {
    let mut processed = 0;

    loop {
        if cancel.is_cancelled() {
            log::debug!("Worker {worker} stopping: run cancelled");
            context.enter_draining();
            break;
        }
        let Ok(batch) = context.queue.try_recv() else {
            break;
        };
        if context.queue.is_empty() {
            context.enter_draining();
        }

        let result = context
            .submitter
            .submit(&context.sessions, worker, &batch)
            .await;
        context.aggregator.record(&batch, &result);
        processed += 1;
    }

    log::debug!("Worker {worker} finished after {processed} batches");
    processed
}
