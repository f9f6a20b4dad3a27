//! # bulksync engine
//!
//! Batch execution engine for bulk create/update/delete against a remote
//! record service. A work list is split into fixed-size batches, dispatched
//! across a bounded pool of service sessions, retried on transient failures,
//! and reported to an observer one operation at a time.
//!
//! ## Modules
//!
//! - [`aggregator`] - Outcome counting and progress observers
//! - [`chunker`] - Splitting work lists into batches
//! - [`client`] - Remote client abstraction and paged retrieval
//! - [`engine`] - Run orchestration and engine state
//! - [`error`] - Engine and client error types
//! - [`model`] - Records, operations, outcomes and progress snapshots
//! - [`session_pool`] - Per-worker session slots
//! - [`simulator`] - In-memory remote service for local runs and tests
//! - [`submitter`] - Multi-operation submission with retry
//! - [`taskpool`] - Semaphore-bounded task spawning

pub mod aggregator;
pub mod chunker;
pub mod client;
pub mod engine;
pub mod error;
pub mod model;
pub mod session_pool;
pub mod simulator;
pub mod submitter;
pub mod taskpool;

pub use aggregator::ProgressObserver;
pub use client::{RecordQuery, RecordSource, RemoteClient, retrieve_all};
pub use engine::{BatchExecutionEngine, EngineConfig, EngineState};
pub use error::{ClientError, EngineError};
pub use model::{
    ItemFailure, ItemOutcome, Operation, OperationKind, Progress, Record, RecordRef, RunSummary,
};
pub use submitter::RetryPolicy;
