use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

pub mod app;
pub mod limits;
pub mod validation;

pub use app::{AppConfig, BatchSettings, DisplaySettings};
pub use validation::ConfigValidationError;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment variables that override file values,
/// e.g. `BULKSYNC_BATCH__BATCH_SIZE=50`
pub const ENV_PREFIX: &str = "BULKSYNC";

#[derive(Debug, Clone)]
pub enum ConfigLoadResult {
    Success(Box<AppConfig>),
    LoadError(String),
    DeserializeError(String),
}

impl ConfigLoadResult {
    pub fn config(&self) -> Option<&AppConfig> {
        match self {
            ConfigLoadResult::Success(config) => Some(config),
            _ => None,
        }
    }

    /// Human readable description of a failed load
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ConfigLoadResult::Success(_) => None,
            ConfigLoadResult::LoadError(msg) | ConfigLoadResult::DeserializeError(msg) => {
                Some(msg)
            }
        }
    }
}

static CONFIG: OnceLock<ConfigLoadResult> = OnceLock::new();

/// Loads configuration from `path` (or `config.toml` when absent) and the
/// environment. A missing default file is not an error; a missing explicit
/// file is.
pub fn load_config(path: Option<&Path>) -> ConfigLoadResult {
    dotenv::dotenv().ok();

    let file_source = match path {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };
    let env_source = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true);

    let config = match Config::builder()
        .add_source(file_source)
        .add_source(env_source) // environment entries override file values
        .build()
    {
        Ok(config) => config,
        Err(e) => {
            return ConfigLoadResult::LoadError(format!(
                "Configuration loading failed: {e}. Please check your config.toml file and environment variables."
            ));
        }
    };

    match config.try_deserialize::<AppConfig>() {
        Ok(app_config) => ConfigLoadResult::Success(Box::new(app_config)),
        Err(e) => ConfigLoadResult::DeserializeError(format!("Failed to deserialize config: {e}")),
    }
}

/// Loads the process-wide configuration once. Later calls return the first
/// result regardless of `path`. Values are validated by the caller after
/// command line overrides are applied.
pub fn init_config(path: Option<&Path>) -> &'static ConfigLoadResult {
    CONFIG.get_or_init(|| load_config(path))
}

/// Additional logging configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct LoggingConfig {
    level: Option<String>,
    file: Option<String>,
}

impl LoggingConfig {
    pub fn level(&self) -> &str {
        self.level.as_deref().unwrap_or("info")
    }

    pub fn file(&self) -> &str {
        self.file.as_deref().unwrap_or("bulksync.log")
    }
}
