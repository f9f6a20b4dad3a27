use super::{LoggingConfig, limits::*, validation::ConfigValidationError};
use engine::simulator::SimulatorSettings;
use engine::{EngineConfig, RetryPolicy};
use serde::Deserialize;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    batch: BatchSettings,
    #[serde(default)]
    display: DisplaySettings,
    #[serde(default)]
    simulator: SimulatorSettings,
    #[serde(default)]
    logging: LoggingConfig,
}

/// How work lists are split and dispatched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchSettings {
    /// Operations per multi-operation request (default: 10)
    batch_size: Option<usize>,
    /// Sessions working in parallel (default: 10)
    max_concurrent_sessions: Option<usize>,
    /// Attempts per batch before it is failed (default: 5)
    max_attempts: Option<u32>,
}

/// Live progress output
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DisplaySettings {
    /// Refresh interval of the progress line (default: 100)
    refresh_interval_ms: Option<u64>,
    /// Most recent failure diagnostics kept for display (default: 10)
    failure_window: Option<usize>,
}

impl AppConfig {
    pub fn batch(&self) -> &BatchSettings {
        &self.batch
    }

    pub fn display(&self) -> &DisplaySettings {
        &self.display
    }

    pub fn simulator(&self) -> &SimulatorSettings {
        &self.simulator
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Applies per-invocation overrides from the command line
    pub fn with_overrides(mut self, batch_size: Option<usize>, sessions: Option<usize>) -> Self {
        if batch_size.is_some() {
            self.batch.batch_size = batch_size;
        }
        if sessions.is_some() {
            self.batch.max_concurrent_sessions = sessions;
        }
        self
    }

    /// Engine settings derived from the batch section
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            batch_size: self.batch.batch_size(),
            max_concurrent_sessions: self.batch.max_concurrent_sessions(),
            retry: RetryPolicy {
                max_attempts: self.batch.max_attempts(),
            },
        }
    }

    /// Validate the configuration against defined limits
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        let batch_size = self.batch.batch_size();
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            errors.push(ConfigValidationError::BatchSize {
                configured: batch_size,
                limit: MAX_BATCH_SIZE,
            });
        }

        let sessions = self.batch.max_concurrent_sessions();
        if sessions == 0 || sessions > MAX_CONCURRENT_SESSIONS {
            errors.push(ConfigValidationError::ConcurrentSessions {
                configured: sessions,
                limit: MAX_CONCURRENT_SESSIONS,
            });
        }

        let attempts = self.batch.max_attempts();
        if attempts == 0 || attempts > MAX_ATTEMPTS {
            errors.push(ConfigValidationError::MaxAttempts {
                configured: attempts,
                limit: MAX_ATTEMPTS,
            });
        }

        if self.display.refresh_interval_ms() < MIN_REFRESH_INTERVAL_MS {
            errors.push(ConfigValidationError::RefreshInterval {
                configured: self.display.refresh_interval_ms(),
                min_limit: MIN_REFRESH_INTERVAL_MS,
            });
        }

        if self.display.failure_window() > MAX_FAILURE_WINDOW {
            errors.push(ConfigValidationError::FailureWindow {
                configured: self.display.failure_window(),
                limit: MAX_FAILURE_WINDOW,
            });
        }

        let rates = [
            (
                "transport_failure_rate",
                self.simulator.transport_failure_rate,
            ),
            ("session_failure_rate", self.simulator.session_failure_rate),
            ("rejection_rate", self.simulator.rejection_rate),
        ];
        for (field, configured) in rates {
            if !(0.0..=1.0).contains(&configured) {
                errors.push(ConfigValidationError::Rate { field, configured });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl BatchSettings {
    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(10)
    }

    pub fn max_concurrent_sessions(&self) -> usize {
        self.max_concurrent_sessions.unwrap_or(10)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(5)
    }
}

impl DisplaySettings {
    pub fn refresh_interval_ms(&self) -> u64 {
        self.refresh_interval_ms.unwrap_or(100)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms())
    }

    pub fn failure_window(&self) -> usize {
        self.failure_window.unwrap_or(10)
    }
}
