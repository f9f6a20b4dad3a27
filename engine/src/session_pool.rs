use crate::client::RemoteClient;
use crate::error::ClientError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;

/// One lazily created session per worker.
///
/// Worker `n` only ever asks for slot `n`, so a session is never shared
/// between two workers. Sessions live as long as the pool, which the engine
/// drops when its run completes.
pub struct SessionPool<C: RemoteClient> {
    base: Arc<C>,
    slots: Vec<OnceCell<C>>,
    created: AtomicUsize,
}

impl<C: RemoteClient> SessionPool<C> {
    pub fn new(base: Arc<C>, workers: usize) -> Self {
        Self {
            base,
            slots: (0..workers).map(|_| OnceCell::new()).collect(),
            created: AtomicUsize::new(0),
        }
    }

    /// Returns the session owned by `worker`, cloning one from the base
    /// client on first use.
    ///
    /// A failed clone leaves the slot empty, so the next request tries
    /// again.
    pub async fn session(&self, worker: usize) -> Result<&C, ClientError> {
        let slot = self
            .slots
            .get(worker)
            .ok_or_else(|| ClientError::Session(format!("no session slot for worker {worker}")))?;

        slot.get_or_try_init(|| async {
            let session = self.base.clone_session().await?;
            let created = self.created.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!("Created session for worker {worker} ({created} sessions open)");
            Ok(session)
        })
        .await
    }

    pub fn sessions_created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
