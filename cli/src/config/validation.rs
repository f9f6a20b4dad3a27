/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid batch_size: {configured} (min: 1, max: {limit})")]
    BatchSize { configured: usize, limit: usize },
    #[error("Invalid max_concurrent_sessions: {configured} (min: 1, max: {limit})")]
    ConcurrentSessions { configured: usize, limit: usize },
    #[error("Invalid max_attempts: {configured} (min: 1, max: {limit})")]
    MaxAttempts { configured: u32, limit: u32 },
    #[error("Invalid refresh_interval_ms: {configured} (min: {min_limit})")]
    RefreshInterval { configured: u64, min_limit: u64 },
    #[error("Invalid failure_window: {configured} (max: {limit})")]
    FailureWindow { configured: usize, limit: usize },
    #[error("Invalid simulator.{field}: {configured} (expected a rate between 0.0 and 1.0)")]
    Rate { field: &'static str, configured: f64 },
}

impl ConfigValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigValidationError::BatchSize { configured, limit } => {
                format!(
                    "Batch size out of range!\n\
                    Your configured value: {configured}\n\
                    Service limit per request: {limit}\n\
                    Please update batch.batch_size in config.toml to a value between 1 and {limit}."
                )
            }
            ConfigValidationError::ConcurrentSessions { configured, limit } => {
                format!(
                    "Too many concurrent sessions!\n\
                    Your configured value: {configured}\n\
                    Service limit per user: {limit}\n\
                    Please update batch.max_concurrent_sessions in config.toml."
                )
            }
            ConfigValidationError::MaxAttempts { configured, limit } => {
                format!(
                    "Attempts per batch out of range!\n\
                    Your configured value: {configured}\n\
                    Valid range: 1 - {limit}\n\
                    Please update batch.max_attempts in config.toml."
                )
            }
            ConfigValidationError::RefreshInterval {
                configured,
                min_limit,
            } => {
                format!(
                    "Display refresh interval too short!\n\
                    Your configured value: {configured} ms\n\
                    Minimum: {min_limit} ms\n\
                    Please update display.refresh_interval_ms in config.toml."
                )
            }
            ConfigValidationError::FailureWindow { configured, limit } => {
                format!(
                    "Failure window too large!\n\
                    Your configured value: {configured}\n\
                    Recommended maximum: {limit}\n\
                    Please update display.failure_window in config.toml."
                )
            }
            ConfigValidationError::Rate { field, configured } => {
                format!(
                    "Simulator rate out of range!\n\
                    Your configured value for {field}: {configured}\n\
                    Rates are probabilities between 0.0 and 1.0."
                )
            }
        }
    }
}
