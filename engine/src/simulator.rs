//! In-memory stand-in for the remote record service.
//!
//! Records live in a shared store keyed by entity and id. Every
//! [`SimulatedClient`] session talks to the same store, so creates, updates
//! and deletes behave like they would against a real service: updating or
//! deleting a missing record faults, creating an existing id faults.
//! Transport failures, session failures and random rejections are injected
//! at configurable rates.

use crate::client::{PagingInfo, RecordPage, RecordQuery, RecordSource, RemoteClient};
use crate::error::ClientError;
use crate::model::{ExecuteMultipleSettings, Fault, ItemResponse, Operation, Record};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// Fault code for a record that does not exist.
pub const FAULT_NOT_FOUND: i32 = -2147220969;
/// Fault code for a create whose id is already taken.
pub const FAULT_DUPLICATE: i32 = -2147220937;
/// Fault code for an injected business-rule rejection.
pub const FAULT_VALIDATION: i32 = -2147220891;

/// Behavior of the simulated service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Chance that a multi-operation call fails in transport.
    pub transport_failure_rate: f64,
    /// Chance that opening a session fails.
    pub session_failure_rate: f64,
    /// Chance that an otherwise valid item is rejected.
    pub rejection_rate: f64,
    /// Round-trip latency per call in milliseconds.
    pub latency_ms: u64,
    /// Largest request group accepted in one call.
    pub max_requests_per_call: usize,
    /// Seed for reproducible failure injection.
    pub seed: Option<u64>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            transport_failure_rate: 0.0,
            session_failure_rate: 0.0,
            rejection_rate: 0.0,
            latency_ms: 0,
            max_requests_per_call: 1000,
            seed: None,
        }
    }
}

/// Counters describing what the service has seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulatorStats {
    pub calls: u64,
    pub transport_failures: u64,
    pub sessions_opened: usize,
    pub items_executed: u64,
}

type Store = HashMap<String, BTreeMap<Uuid, Record>>;

struct ServiceState {
    settings: SimulatorSettings,
    store: Mutex<Store>,
    rng: Mutex<fastrand::Rng>,
    calls: AtomicU64,
    transport_failures: AtomicU64,
    items_executed: AtomicU64,
    sessions_opened: AtomicUsize,
}

impl ServiceState {
    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn roll(&self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.f64() < rate
    }
}

/// Handle to one simulated service instance.
#[derive(Clone)]
pub struct SimulatedService {
    state: Arc<ServiceState>,
}

impl SimulatedService {
    pub fn new(settings: SimulatorSettings) -> Self {
        let rng = match settings.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self {
            state: Arc::new(ServiceState {
                settings,
                store: Mutex::new(HashMap::new()),
                rng: Mutex::new(rng),
                calls: AtomicU64::new(0),
                transport_failures: AtomicU64::new(0),
                items_executed: AtomicU64::new(0),
                sessions_opened: AtomicUsize::new(0),
            }),
        }
    }

    /// A client bound to this service. Sessions cloned from it share the
    /// same store.
    pub fn client(&self) -> SimulatedClient {
        SimulatedClient {
            state: self.state.clone(),
            session: 0,
        }
    }

    /// Inserts `count` records of `entity` with a generated `name` column.
    pub fn seed(&self, entity: &str, count: usize) -> Vec<Record> {
        let records: Vec<Record> = (0..count)
            .map(|i| {
                Record::new(entity, Uuid::new_v4()).with_attribute("name", format!("{entity} {i}"))
            })
            .collect();
        let mut store = self.state.store();
        let table = store.entry(entity.to_string()).or_default();
        for record in &records {
            table.insert(record.id, record.clone());
        }
        records
    }

    pub fn get(&self, entity: &str, id: Uuid) -> Option<Record> {
        self.state
            .store()
            .get(entity)
            .and_then(|table| table.get(&id))
            .cloned()
    }

    pub fn count(&self, entity: &str) -> usize {
        self.state.store().get(entity).map_or(0, BTreeMap::len)
    }

    pub fn stats(&self) -> SimulatorStats {
        SimulatorStats {
            calls: self.state.calls.load(Ordering::Relaxed),
            transport_failures: self.state.transport_failures.load(Ordering::Relaxed),
            sessions_opened: self.state.sessions_opened.load(Ordering::Relaxed),
            items_executed: self.state.items_executed.load(Ordering::Relaxed),
        }
    }
}

/// A session against a [`SimulatedService`].
pub struct SimulatedClient {
    state: Arc<ServiceState>,
    session: usize,
}

impl SimulatedClient {
    pub fn session_id(&self) -> usize {
        self.session
    }

    async fn round_trip(&self) {
        let latency = self.state.settings.latency_ms;
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
    }

    fn apply(&self, store: &mut Store, operation: &Operation) -> Result<(), Fault> {
        match operation {
            Operation::Create(record) => {
                let table = store.entry(record.entity.clone()).or_default();
                if table.contains_key(&record.id) {
                    return Err(Fault {
                        code: Some(FAULT_DUPLICATE),
                        message: format!(
                            "A record with id {} already exists in {}",
                            record.id, record.entity
                        ),
                    });
                }
                self.reject_randomly(operation)?;
                table.insert(record.id, record.clone());
            }
            Operation::Update(record) => {
                let existing = store
                    .get_mut(&record.entity)
                    .and_then(|table| table.get_mut(&record.id))
                    .ok_or_else(|| not_found(&record.entity, record.id))?;
                self.reject_randomly(operation)?;
                for (name, value) in &record.attributes {
                    existing.attributes.insert(name.clone(), value.clone());
                }
            }
            Operation::Delete(target) => {
                let table = store
                    .get_mut(&target.entity)
                    .filter(|table| table.contains_key(&target.id))
                    .ok_or_else(|| not_found(&target.entity, target.id))?;
                self.reject_randomly(operation)?;
                table.remove(&target.id);
            }
        }
        Ok(())
    }

    fn reject_randomly(&self, operation: &Operation) -> Result<(), Fault> {
        if self.state.roll(self.state.settings.rejection_rate) {
            return Err(Fault {
                code: Some(FAULT_VALIDATION),
                message: format!("Business rule rejected {operation}"),
            });
        }
        Ok(())
    }
}

fn not_found(entity: &str, id: Uuid) -> Fault {
    Fault {
        code: Some(FAULT_NOT_FOUND),
        message: format!("{entity} With Id = {id} Does Not Exist"),
    }
}

#[async_trait]
impl RemoteClient for SimulatedClient {
    async fn clone_session(&self) -> Result<Self, ClientError> {
        self.round_trip().await;
        if self.state.roll(self.state.settings.session_failure_rate) {
            return Err(ClientError::Session(
                "simulated authentication failure".to_string(),
            ));
        }
        let session = self.state.sessions_opened.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(Self {
            state: self.state.clone(),
            session,
        })
    }

    async fn execute_multiple(
        &self,
        requests: &[Operation],
        settings: ExecuteMultipleSettings,
    ) -> Result<Vec<ItemResponse>, ClientError> {
        self.state.calls.fetch_add(1, Ordering::Relaxed);
        self.round_trip().await;

        let limit = self.state.settings.max_requests_per_call;
        if requests.len() > limit {
            return Err(ClientError::Rejected(format!(
                "request group of {} exceeds the limit of {}",
                requests.len(),
                limit
            )));
        }
        if self.state.roll(self.state.settings.transport_failure_rate) {
            self.state.transport_failures.fetch_add(1, Ordering::Relaxed);
            return Err(ClientError::Transport(
                "simulated connection reset".to_string(),
            ));
        }

        let mut store = self.state.store();
        let mut responses = Vec::with_capacity(requests.len());
        for (index, operation) in requests.iter().enumerate() {
            self.state.items_executed.fetch_add(1, Ordering::Relaxed);
            match self.apply(&mut store, operation) {
                Ok(()) => {
                    if settings.return_responses {
                        responses.push(ItemResponse::success(index));
                    }
                }
                Err(fault) => {
                    responses.push(ItemResponse::fault(index, fault));
                    if !settings.continue_on_error {
                        break;
                    }
                }
            }
        }
        Ok(responses)
    }
}

#[async_trait]
impl RecordSource for SimulatedClient {
    async fn retrieve_multiple(
        &self,
        query: &RecordQuery,
        paging: &PagingInfo,
    ) -> Result<RecordPage, ClientError> {
        self.round_trip().await;

        let store = self.state.store();
        let Some(table) = store.get(&query.entity) else {
            return Ok(RecordPage::default());
        };

        let count = paging.count.max(1) as usize;
        let after = paging
            .paging_cookie
            .as_deref()
            .and_then(|cookie| Uuid::parse_str(cookie).ok());
        let candidates: Box<dyn Iterator<Item = &Record>> = match after {
            Some(last) => Box::new(
                table
                    .range((std::ops::Bound::Excluded(last), std::ops::Bound::Unbounded))
                    .map(|(_, r)| r),
            ),
            None => Box::new(
                table
                    .values()
                    .skip(paging.page_number.saturating_sub(1) as usize * count),
            ),
        };

        let mut page: Vec<Record> = candidates.take(count + 1).cloned().collect();
        let more_records = page.len() > count;
        page.truncate(count);

        let records: Vec<Record> = page
            .into_iter()
            .map(|record| project(record, &query.columns))
            .collect();
        let paging_cookie = records.last().map(|r| r.id.to_string());

        Ok(RecordPage {
            records,
            more_records,
            paging_cookie,
        })
    }
}

fn project(mut record: Record, columns: &[String]) -> Record {
    record.attributes = columns
        .iter()
        .filter_map(|column| {
            record
                .attributes
                .get(column)
                .map(|value: &Value| (column.clone(), value.clone()))
        })
        .collect();
    record
}
