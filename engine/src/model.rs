//! Data model shared by the engine, the remote client and callers.
//!
//! Operations and records are plain serde types so callers can build work
//! lists from JSON. Everything the engine hands back to observers
//! ([`Progress`], [`ItemFailure`], [`RunSummary`]) is an owned value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// A record in the remote service: an entity (table) name, an id and the
/// column values to write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub entity: String,
    pub id: Uuid,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Record {
    pub fn new(entity: impl Into<String>, id: Uuid) -> Self {
        Self {
            entity: entity.into(),
            id,
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Reference to this record, dropping its column values.
    pub fn to_ref(&self) -> RecordRef {
        RecordRef {
            entity: self.entity.clone(),
            id: self.id,
        }
    }
}

/// Identifies a record without carrying any column values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub entity: String,
    pub id: Uuid,
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.entity, self.id)
    }
}

/// One intended mutation against one remote record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "target", rename_all = "snake_case")]
pub enum Operation {
    Create(Record),
    Update(Record),
    Delete(RecordRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        f.write_str(name)
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create(_) => OperationKind::Create,
            Operation::Update(_) => OperationKind::Update,
            Operation::Delete(_) => OperationKind::Delete,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            Operation::Create(record) | Operation::Update(record) => &record.entity,
            Operation::Delete(target) => &target.entity,
        }
    }

    pub fn record_id(&self) -> Uuid {
        match self {
            Operation::Create(record) | Operation::Update(record) => record.id,
            Operation::Delete(target) => target.id,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}({})", self.kind(), self.entity(), self.record_id())
    }
}

/// Settings sent along with a multi-operation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteMultipleSettings {
    /// Keep executing the remaining requests after one of them faults.
    pub continue_on_error: bool,
    /// Return a response item for every request, not only for faults.
    pub return_responses: bool,
}

impl Default for ExecuteMultipleSettings {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            return_responses: true,
        }
    }
}

/// Business-rule rejection of a single request, as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub code: Option<i32>,
    pub message: String,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }
}

/// Raw per-request entry of a multi-operation response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResponse {
    /// Position of the request inside the submitted batch.
    pub request_index: usize,
    pub fault: Option<Fault>,
}

impl ItemResponse {
    pub fn success(request_index: usize) -> Self {
        Self {
            request_index,
            fault: None,
        }
    }

    pub fn fault(request_index: usize, fault: Fault) -> Self {
        Self {
            request_index,
            fault: Some(fault),
        }
    }
}

/// Final result for one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Success,
    /// `message` is `None` when the whole batch failed in transport and the
    /// failure cannot be attributed to this item.
    Failure { message: Option<String> },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success)
    }
}

/// Snapshot of a run's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub total: usize,
    pub success_count: usize,
    pub fail_count: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            success_count: 0,
            fail_count: 0,
        }
    }

    pub fn processed(&self) -> usize {
        self.success_count + self.fail_count
    }

    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.processed())
    }

    pub fn is_complete(&self) -> bool {
        self.processed() == self.total
    }

    /// Processed share of the total in percent; an empty run is 100% done.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.processed() as f64 * 100.0 / self.total as f64
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Total: {}, Success: {}, Error: {}",
            self.total, self.success_count, self.fail_count
        )
    }
}

/// A failed operation as reported to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Position of the operation in the caller's work list.
    pub position: usize,
    pub batch_index: usize,
    /// Diagnostic from the service; `None` for whole-batch transport failures.
    pub message: Option<String>,
}

/// What a finished run reports back to its caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub progress: Progress,
    pub batches: usize,
    pub sessions_created: usize,
    /// The run was cancelled before every batch was dispatched.
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn empty() -> Self {
        Self {
            progress: Progress::new(0),
            batches: 0,
            sessions_created: 0,
            cancelled: false,
            elapsed: Duration::ZERO,
        }
    }

    pub fn is_complete_success(&self) -> bool {
        !self.cancelled && self.progress.is_complete() && self.progress.fail_count == 0
    }
}
