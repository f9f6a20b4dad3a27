//! # bulksync
//!
//! Command line front end for the bulk execution engine. Each command builds
//! a work list, runs it against the simulated record service and draws a
//! live progress line until the run completes.
//!
//! ## Modules
//!
//! - [`app`] - Command execution and Ctrl-C handling
//! - [`cli`] - Command line arguments
//! - [`config`] - Configuration loading and validation
//! - [`display`] - Live progress rendering
//! - [`error`] - Application error types
//! - [`logger`] - File logger setup
//! - [`monitor`] - Progress observer and run reports
//! - [`workload`] - Work list generation, retrieval and parsing

pub mod app;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod logger;
pub mod monitor;
pub mod workload;

pub use error::{AppError, AppResult};
