//! Counting outcomes and reporting progress.
//!
//! Success and failure counts share one 64-bit atomic word: success in the
//! high half, failure in the low half. A single `fetch_add` both records an
//! outcome and yields the exact snapshot that followed it, so concurrent
//! workers never hand observers a torn or regressing pair.

use crate::chunker::Batch;
use crate::model::{ItemFailure, ItemOutcome, Progress};
use crate::submitter::BatchResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

const SUCCESS_ONE: u64 = 1 << 32;
const FAIL_ONE: u64 = 1;
const HALF_MASK: u64 = u32::MAX as u64;

/// Receives progress from a running engine.
///
/// Called concurrently from every worker; implementations must be cheap and
/// thread-safe. A slow observer throttles the run but never deadlocks it.
/// Any `Fn(Progress) + Send + Sync` closure is an observer.
pub trait ProgressObserver: Send + Sync {
    /// Called once per operation, right after its outcome was counted.
    fn on_progress(&self, progress: Progress);

    /// Called for every failed operation, before the matching
    /// [`on_progress`](ProgressObserver::on_progress).
    fn on_item_failed(&self, _failure: &ItemFailure) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(Progress) + Send + Sync,
{
    fn on_progress(&self, progress: Progress) {
        self(progress)
    }
}

/// Lock-free success/failure counters for one run.
#[derive(Debug)]
pub struct ProgressCounter {
    total: usize,
    packed: AtomicU64,
}

impl ProgressCounter {
    /// `total` must fit in 32 bits; the engine rejects larger work lists.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            packed: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self) -> Progress {
        self.add(SUCCESS_ONE)
    }

    pub fn record_failure(&self) -> Progress {
        self.add(FAIL_ONE)
    }

    pub fn snapshot(&self) -> Progress {
        self.unpack(self.packed.load(Ordering::Acquire))
    }

    fn add(&self, delta: u64) -> Progress {
        let previous = self.packed.fetch_add(delta, Ordering::AcqRel);
        self.unpack(previous + delta)
    }

    fn unpack(&self, word: u64) -> Progress {
        Progress {
            total: self.total,
            success_count: (word >> 32) as usize,
            fail_count: (word & HALF_MASK) as usize,
        }
    }
}

/// Turns batch results into counter increments and observer callbacks.
#[derive(Clone)]
pub struct ResultAggregator {
    counter: Arc<ProgressCounter>,
    observer: Arc<dyn ProgressObserver>,
}

impl ResultAggregator {
    pub fn new(counter: Arc<ProgressCounter>, observer: Arc<dyn ProgressObserver>) -> Self {
        Self { counter, observer }
    }

    /// Records every outcome of `result`, in order, one callback each.
    pub fn record(&self, batch: &Batch, result: &BatchResult) {
        for (request_index, outcome) in &result.outcomes {
            let progress = match outcome {
                ItemOutcome::Success => self.counter.record_success(),
                ItemOutcome::Failure { message } => {
                    let failure = ItemFailure {
                        position: batch.offset + request_index,
                        batch_index: batch.index,
                        message: message.clone(),
                    };
                    if let Some(message) = message {
                        log::error!(
                            "Operation {} ({}) failed: {}",
                            failure.position,
                            describe(batch, *request_index),
                            message
                        );
                    }
                    self.observer.on_item_failed(&failure);
                    self.counter.record_failure()
                }
            };
            self.observer.on_progress(progress);
        }
    }

    pub fn snapshot(&self) -> Progress {
        self.counter.snapshot()
    }
}

fn describe(batch: &Batch, request_index: usize) -> String {
    batch
        .operations
        .get(request_index)
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown operation".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::model::{Operation, Record};
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct Recorder {
        progress: Mutex<Vec<Progress>>,
        failures: Mutex<Vec<ItemFailure>>,
    }

    impl ProgressObserver for Recorder {
        fn on_progress(&self, progress: Progress) {
            self.progress.lock().unwrap().push(progress);
        }

        fn on_item_failed(&self, failure: &ItemFailure) {
            self.failures.lock().unwrap().push(failure.clone());
        }
    }

    fn batch(index: usize, offset: usize, len: usize) -> Batch {
        Batch {
            index,
            offset,
            operations: (0..len)
                .map(|_| Operation::Update(Record::new("account", Uuid::new_v4())))
                .collect(),
        }
    }

    #[test]
    fn test_counter_snapshots_are_exact() {
        let counter = ProgressCounter::new(3);
        assert_eq!(counter.record_success().success_count, 1);
        let p = counter.record_failure();
        assert_eq!((p.success_count, p.fail_count), (1, 1));
        let p = counter.record_success();
        assert_eq!((p.total, p.success_count, p.fail_count), (3, 2, 1));
        assert_eq!(counter.snapshot(), p);
    }

    #[test]
    fn test_one_callback_per_item() {
        let recorder = Arc::new(Recorder::default());
        let aggregator = ResultAggregator::new(Arc::new(ProgressCounter::new(5)), recorder.clone());

        let b = batch(1, 10, 3);
        let result = BatchResult {
            outcomes: vec![
                (0, ItemOutcome::Success),
                (
                    1,
                    ItemOutcome::Failure {
                        message: Some("Duplicate record".into()),
                    },
                ),
                (2, ItemOutcome::Success),
            ],
            attempts: 1,
            transport_error: None,
        };
        aggregator.record(&b, &result);

        let progress = recorder.progress.lock().unwrap();
        assert_eq!(progress.len(), 3);
        assert_eq!(progress[2].processed(), 3);
        assert_eq!(progress[2].fail_count, 1);

        let failures = recorder.failures.lock().unwrap();
        assert_eq!(
            *failures,
            vec![ItemFailure {
                position: 11,
                batch_index: 1,
                message: Some("Duplicate record".into()),
            }]
        );
    }

    #[test]
    fn test_whole_batch_failure_counts_every_item() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let observer = move |p: Progress| sink.lock().unwrap().push(p);
        let aggregator = ResultAggregator::new(Arc::new(ProgressCounter::new(4)), Arc::new(observer));

        let result = BatchResult::whole_batch_failure(4, 5, ClientError::Transport("down".into()));
        aggregator.record(&batch(0, 0, 4), &result);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls.last().copied(),
            Some(Progress {
                total: 4,
                success_count: 0,
                fail_count: 4,
            })
        );
    }

    #[test]
    fn test_concurrent_snapshots_never_regress() {
        let counter = Arc::new(ProgressCounter::new(8000));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    let mut last = 0;
                    for i in 0..1000 {
                        let p = if (i + worker) % 3 == 0 {
                            counter.record_failure()
                        } else {
                            counter.record_success()
                        };
                        assert!(p.processed() > last);
                        last = p.processed();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let done = counter.snapshot();
        assert_eq!(done.processed(), 8000);
        assert!(done.is_complete());
    }
}
