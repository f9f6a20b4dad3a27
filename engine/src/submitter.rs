use crate::chunker::Batch;
use crate::client::RemoteClient;
use crate::error::ClientError;
use crate::model::{ExecuteMultipleSettings, ItemOutcome, ItemResponse};
use crate::session_pool::SessionPool;

/// Attempts per batch before it is recorded as failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Diagnostic for a request the service returned no response item for.
pub const MISSING_RESPONSE: &str = "no response returned for request";

/// How often a batch is attempted. Retries are immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Outcome of submitting one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// One `(request_index, outcome)` pair per operation of the batch, in
    /// the order the service listed them.
    pub outcomes: Vec<(usize, ItemOutcome)>,
    pub attempts: u32,
    /// Set when every attempt failed and the batch was failed as a whole.
    pub transport_error: Option<ClientError>,
}

impl BatchResult {
    /// Every operation of a `len`-sized batch failed, none attributable.
    pub fn whole_batch_failure(len: usize, attempts: u32, error: ClientError) -> Self {
        Self {
            outcomes: (0..len)
                .map(|index| (index, ItemOutcome::Failure { message: None }))
                .collect(),
            attempts,
            transport_error: Some(error),
        }
    }

    pub fn is_transport_failure(&self) -> bool {
        self.transport_error.is_some()
    }
}

/// Sends batches as multi-operation requests and retries transient
/// round-trip failures.
#[derive(Debug, Clone)]
pub struct BatchSubmitter {
    policy: RetryPolicy,
    settings: ExecuteMultipleSettings,
}

impl BatchSubmitter {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            settings: ExecuteMultipleSettings::default(),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Submits `batch` through the session owned by `worker`.
    ///
    /// Every attempt first acquires the worker's session, so a failed
    /// session creation costs one attempt like any other transient error.
    /// Transient client errors repeat the whole request up to the policy's
    /// ceiling; a non-transient error stops at once. Item faults inside a
    /// delivered response are final and never retried.
    pub async fn submit<C: RemoteClient>(
        &self,
        sessions: &SessionPool<C>,
        worker: usize,
        batch: &Batch,
    ) -> BatchResult {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        let error = loop {
            attempt += 1;
            let delivered = match sessions.session(worker).await {
                Ok(session) => {
                    session
                        .execute_multiple(&batch.operations, self.settings)
                        .await
                }
                Err(e) => Err(e),
            };
            match delivered {
                Ok(responses) => {
                    log::debug!(
                        "Batch {} delivered on attempt {} ({} responses)",
                        batch.index,
                        attempt,
                        responses.len()
                    );
                    return BatchResult {
                        outcomes: normalize(batch, responses),
                        attempts: attempt,
                        transport_error: None,
                    };
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    log::debug!("Batch {} attempt {} failed: {}", batch.index, attempt, e);
                    continue;
                }
                Err(e) => break e,
            }
        };

        log::warn!(
            "Batch {} failed after {} attempt(s), recording {} operations as failed: {}",
            batch.index,
            attempt,
            batch.len(),
            error
        );
        BatchResult::whole_batch_failure(batch.len(), attempt, error)
    }
}

/// Maps raw responses to exactly one outcome per operation.
///
/// Response order is kept. Entries pointing outside the batch or at an
/// already answered request are dropped; unanswered requests are appended
/// as failures.
fn normalize(batch: &Batch, responses: Vec<ItemResponse>) -> Vec<(usize, ItemOutcome)> {
    let mut answered = vec![false; batch.len()];
    let mut outcomes = Vec::with_capacity(batch.len());

    for response in responses {
        let index = response.request_index;
        match answered.get_mut(index) {
            Some(seen) if !*seen => {
                *seen = true;
                let outcome = match response.fault {
                    None => ItemOutcome::Success,
                    Some(fault) => ItemOutcome::Failure {
                        message: Some(fault.message),
                    },
                };
                outcomes.push((index, outcome));
            }
            Some(_) => {
                log::warn!(
                    "Batch {}: duplicate response for request {}, ignoring",
                    batch.index,
                    index
                );
            }
            None => {
                log::warn!(
                    "Batch {}: response for request {} outside batch of {}, ignoring",
                    batch.index,
                    index,
                    batch.len()
                );
            }
        }
    }

    for (index, _) in answered.iter().enumerate().filter(|(_, seen)| !**seen) {
        outcomes.push((
            index,
            ItemOutcome::Failure {
                message: Some(MISSING_RESPONSE.to_string()),
            },
        ));
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fault, Operation, RecordRef};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use uuid::Uuid;

    type Script = Vec<Result<Vec<ItemResponse>, ClientError>>;

    /// Replays scripted results, one per call. Sessions cloned from it share
    /// the script and the counters.
    #[derive(Clone, Default)]
    struct ScriptedClient {
        script: Arc<Mutex<Script>>,
        calls: Arc<Mutex<u32>>,
        failing_clones: Arc<Mutex<u32>>,
        clone_attempts: Arc<Mutex<u32>>,
    }

    impl ScriptedClient {
        fn new(mut script: Script) -> Self {
            script.reverse();
            Self {
                script: Arc::new(Mutex::new(script)),
                ..Default::default()
            }
        }

        fn failing_clones(self, count: u32) -> Self {
            *self.failing_clones.lock().unwrap() = count;
            self
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }

        fn clone_attempts(&self) -> u32 {
            *self.clone_attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl RemoteClient for ScriptedClient {
        async fn clone_session(&self) -> Result<Self, ClientError> {
            *self.clone_attempts.lock().unwrap() += 1;
            let mut failing = self.failing_clones.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(ClientError::Session("login refused".into()));
            }
            Ok(self.clone())
        }

        async fn execute_multiple(
            &self,
            _requests: &[Operation],
            settings: ExecuteMultipleSettings,
        ) -> Result<Vec<ItemResponse>, ClientError> {
            assert!(settings.continue_on_error);
            *self.calls.lock().unwrap() += 1;
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ClientError::Transport("script exhausted".into())))
        }
    }

    async fn submit(client: &ScriptedClient, batch: &Batch) -> BatchResult {
        let sessions = SessionPool::new(Arc::new(client.clone()), 1);
        BatchSubmitter::new(RetryPolicy::default())
            .submit(&sessions, 0, batch)
            .await
    }

    fn batch(len: usize) -> Batch {
        Batch {
            index: 0,
            offset: 0,
            operations: (0..len)
                .map(|_| {
                    Operation::Delete(RecordRef {
                        entity: "account".into(),
                        id: Uuid::new_v4(),
                    })
                })
                .collect(),
        }
    }

    fn all_ok(len: usize) -> Vec<ItemResponse> {
        (0..len).map(ItemResponse::success).collect()
    }

    #[tokio::test]
    async fn test_retries_until_delivered() {
        let client = ScriptedClient::new(vec![
            Err(ClientError::Transport("reset".into())),
            Err(ClientError::Timeout { seconds: 30 }),
            Ok(all_ok(3)),
        ]);
        let result = submit(&client, &batch(3)).await;

        assert_eq!(client.calls(), 3);
        assert_eq!(result.attempts, 3);
        assert!(!result.is_transport_failure());
        assert!(result.outcomes.iter().all(|(_, o)| o.is_success()));
    }

    #[tokio::test]
    async fn test_gives_up_after_five_attempts() {
        let client = ScriptedClient::new(Vec::new());
        let result = submit(&client, &batch(4)).await;

        assert_eq!(client.calls(), 5);
        assert_eq!(result.attempts, 5);
        assert!(result.is_transport_failure());
        assert_eq!(result.outcomes.len(), 4);
        assert!(
            result
                .outcomes
                .iter()
                .all(|(_, o)| *o == ItemOutcome::Failure { message: None })
        );
    }

    #[tokio::test]
    async fn test_rejected_request_is_not_retried() {
        let client = ScriptedClient::new(vec![Err(ClientError::Rejected("bad request".into()))]);
        let result = submit(&client, &batch(2)).await;

        assert_eq!(client.calls(), 1);
        assert_eq!(
            result.transport_error,
            Some(ClientError::Rejected("bad request".into()))
        );
    }

    #[tokio::test]
    async fn test_item_fault_is_not_retried() {
        let client = ScriptedClient::new(vec![Ok(vec![
            ItemResponse::success(0),
            ItemResponse::fault(1, Fault::new("Record does not exist")),
            ItemResponse::success(2),
        ])]);
        let result = submit(&client, &batch(3)).await;

        assert_eq!(client.calls(), 1);
        assert_eq!(
            result.outcomes[1],
            (
                1,
                ItemOutcome::Failure {
                    message: Some("Record does not exist".into())
                }
            )
        );
        assert!(result.outcomes[0].1.is_success());
        assert!(result.outcomes[2].1.is_success());
    }

    #[tokio::test]
    async fn test_session_failure_uses_one_attempt() {
        let client = ScriptedClient::new(vec![Ok(all_ok(2))]).failing_clones(2);
        let result = submit(&client, &batch(2)).await;

        assert_eq!(client.clone_attempts(), 3);
        assert_eq!(client.calls(), 1);
        assert_eq!(result.attempts, 3);
        assert!(!result.is_transport_failure());
        assert!(result.outcomes.iter().all(|(_, o)| o.is_success()));
    }

    #[tokio::test]
    async fn test_session_never_created_fails_after_five_attempts() {
        let client = ScriptedClient::new(Vec::new()).failing_clones(u32::MAX);
        let result = submit(&client, &batch(2)).await;

        assert_eq!(client.clone_attempts(), 5);
        assert_eq!(client.calls(), 0);
        assert_eq!(result.attempts, 5);
        assert_eq!(
            result.transport_error,
            Some(ClientError::Session("login refused".into()))
        );
    }

    #[test]
    fn test_normalize_fills_gaps_and_drops_strays() {
        let responses = vec![
            ItemResponse::success(2),
            ItemResponse::success(2),
            ItemResponse::success(7),
            ItemResponse::success(0),
        ];
        let outcomes = normalize(&batch(3), responses);

        assert_eq!(
            outcomes,
            vec![
                (2, ItemOutcome::Success),
                (0, ItemOutcome::Success),
                (
                    1,
                    ItemOutcome::Failure {
                        message: Some(MISSING_RESPONSE.into())
                    }
                ),
            ]
        );
    }
}
