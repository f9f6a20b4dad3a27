use thiserror::Error;

/// Errors raised by the engine itself.
///
/// Partial failure of a run is never an `EngineError`: failed records are
/// reported through [`Progress`](crate::model::Progress) counts and the
/// observer's failure hook. Only misconfiguration and programming misuse
/// abort a run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caller supplied settings the engine cannot run with.
    ///
    /// Raised synchronously, before any batch is dispatched.
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    /// A worker task panicked or was aborted by the runtime.
    #[error("Batch worker {worker} terminated abnormally: {reason}")]
    WorkerPanicked { worker: usize, reason: String },
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by a [`RemoteClient`](crate::client::RemoteClient).
///
/// These describe the failure of a whole round trip. A business-rule
/// rejection of a single record is not a `ClientError`; it travels as a
/// [`Fault`](crate::model::Fault) inside a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The connection dropped or the request could not be delivered.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The service did not answer within the client's deadline.
    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// A session could not be created or its auth context expired.
    #[error("Session failure: {0}")]
    Session(String),

    /// The service refused the request as a whole (malformed request,
    /// missing privilege). Repeating it cannot succeed.
    #[error("Request rejected: {0}")]
    Rejected(String),
}

impl ClientError {
    /// Whether repeating the same request may succeed.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ClientError::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ClientError::Transport("reset by peer".into()).is_transient());
        assert!(ClientError::Timeout { seconds: 30 }.is_transient());
        assert!(ClientError::Session("token expired".into()).is_transient());
        assert!(!ClientError::Rejected("missing privilege".into()).is_transient());
    }

    #[test]
    fn test_invalid_configuration_message() {
        let err = EngineError::invalid("batch_size", "must be greater than zero");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: batch_size must be greater than zero"
        );
    }
}
