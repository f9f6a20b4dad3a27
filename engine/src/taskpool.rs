use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns tasks on the tokio runtime, at most `n_tasks` running at once.
///
/// A task waits for a free slot before it starts. Cancelling the pool's
/// token releases tasks still waiting for a slot; tasks already running
/// are left to observe the token themselves.
pub struct TaskPool {
    semaphore: Arc<Semaphore>,
    cancel_token: CancellationToken,
}

impl TaskPool {
    pub fn new(n_tasks: usize) -> TaskPool {
        Self::with_cancel_token(n_tasks, CancellationToken::new())
    }

    pub fn with_cancel_token(n_tasks: usize, cancel_token: CancellationToken) -> TaskPool {
        TaskPool {
            semaphore: Arc::new(Semaphore::new(n_tasks)),
            cancel_token,
        }
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Spawns `func` once a slot is free.
    ///
    /// The handle yields `None` when the pool was cancelled or closed
    /// before the task got a slot.
    pub fn execute<F, T>(&self, func: F) -> JoinHandle<Option<T>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = self.semaphore.clone();
        let token = self.cancel_token.clone();
        tokio::spawn(async move {
            let permit = tokio::select! {
                permit = semaphore.acquire_owned() => permit.ok(),
                () = token.cancelled() => None,
            };
            let _permit = permit?;
            Some(func.await)
        })
    }

    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Drop for TaskPool {
    fn drop(&mut self) {
        self.semaphore.close();
        self.cancel_token.cancel();
    }
}
