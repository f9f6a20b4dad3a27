use engine::{ClientError, EngineError};
use thiserror::Error;

/// Errors that end a `bulksync` invocation.
///
/// Failed records never show up here: a run with partial failures still
/// completes and reports its counts. These variants cover problems that
/// prevent a run from starting or finishing at all.
///
/// # Error Categories
///
/// - [`Config`] - configuration file, environment or validation problems
/// - [`Input`] - unreadable or malformed operation files
/// - [`Retrieval`] - paged retrieval of the records to update or delete
/// - [`Engine`] - engine misconfiguration or a crashed worker
/// - [`Logger`] - logger installation failures
///
/// [`Config`]: AppError::Config
/// [`Input`]: AppError::Input
/// [`Retrieval`]: AppError::Retrieval
/// [`Engine`]: AppError::Engine
/// [`Logger`]: AppError::Logger
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Input Error: {0}")]
    Input(String),

    #[error("I/O Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Retrieval Error: {0}")]
    Retrieval(#[from] ClientError),

    #[error("Engine Error: {0}")]
    Engine(#[from] EngineError),

    #[error("Logger Error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Input(format!("Invalid operation file: {err}"))
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
