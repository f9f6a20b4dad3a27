use bulksync::config::{ConfigLoadResult, ConfigValidationError, load_config};
use claims::{assert_none, assert_some};
use std::io::Write;
use std::path::Path;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_file_values_reach_engine_config() {
    let file = write_config(
        r#"
[batch]
batch_size = 25
max_concurrent_sessions = 4

[display]
failure_window = 3

[simulator]
rejection_rate = 0.25
seed = 7

[logging]
level = "debug"
file = "run.log"
"#,
    );

    let loaded = load_config(Some(file.path()));
    let config = assert_some!(loaded.config());
    let engine = config.engine_config();

    assert_eq!(engine.batch_size, 25);
    assert_eq!(engine.max_concurrent_sessions, 4);
    assert_eq!(engine.retry.max_attempts, 5);
    assert_eq!(config.display().failure_window(), 3);
    assert_eq!(config.simulator().rejection_rate, 0.25);
    assert_eq!(config.simulator().seed, Some(7));
    assert_eq!(config.logging().level(), "debug");
    assert_eq!(config.logging().file(), "run.log");
    assert!(config.validate().is_ok());
}

#[test]
fn test_missing_explicit_file_is_a_load_error() {
    let loaded = load_config(Some(Path::new("/nonexistent/bulksync.toml")));
    assert!(matches!(loaded, ConfigLoadResult::LoadError(_)));
    assert_none!(loaded.config());
    assert_some!(loaded.error_message());
}

#[test]
fn test_wrong_type_is_a_deserialize_error() {
    let file = write_config("[batch]\nbatch_size = \"many\"\n");
    let loaded = load_config(Some(file.path()));
    assert!(matches!(loaded, ConfigLoadResult::DeserializeError(_)));
}

#[test]
fn test_out_of_range_values_fail_validation() {
    let file = write_config("[batch]\nbatch_size = 5000\nmax_attempts = 0\n");
    let loaded = load_config(Some(file.path()));
    let errors = loaded.config().unwrap().validate().unwrap_err();

    assert_eq!(
        errors,
        vec![
            ConfigValidationError::BatchSize {
                configured: 5000,
                limit: 1000
            },
            ConfigValidationError::MaxAttempts {
                configured: 0,
                limit: 20
            },
        ]
    );
    assert!(errors[0].user_message().contains("batch.batch_size"));
}

#[test]
fn test_command_line_overrides_win() {
    let file = write_config("[batch]\nbatch_size = 25\nmax_concurrent_sessions = 4\n");
    let loaded = load_config(Some(file.path()));
    let config = loaded.config().unwrap().clone().with_overrides(None, Some(8));

    assert_eq!(config.engine_config().batch_size, 25);
    assert_eq!(config.engine_config().max_concurrent_sessions, 8);
}
