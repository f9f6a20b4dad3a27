//! Wiring a command to the engine, the simulated service and the display.

use crate::cli::Command;
use crate::config::AppConfig;
use crate::display::render_until_cancelled;
use crate::error::AppResult;
use crate::monitor::{FailureEntry, ProgressMonitor};
use crate::workload::{fetch_targets, generate_records, mark_modified, read_operations};
use engine::simulator::SimulatedService;
use engine::{BatchExecutionEngine, Operation, RunSummary};
use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of one command invocation.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub recent_failures: Vec<FailureEntry>,
    pub failures_seen: usize,
}

/// Runs `command` against a fresh simulated service, drawing progress to
/// stdout. Ctrl-C stops dispatching new batches.
pub async fn execute(command: &Command, config: &AppConfig) -> AppResult<RunReport> {
    let cancel = CancellationToken::new();
    let watcher = cancel_on_ctrl_c(cancel.clone());
    let service = SimulatedService::new(config.simulator().clone());

    let report = execute_with(command, config, &service, cancel.clone(), std::io::stdout()).await;

    // Stops the signal watcher when the run ended on its own.
    cancel.cancel();
    let _ = watcher.await;
    report
}

/// Like [`execute`], with the service, cancellation and output supplied by
/// the caller.
pub async fn execute_with<W>(
    command: &Command,
    config: &AppConfig,
    service: &SimulatedService,
    cancel: CancellationToken,
    out: W,
) -> AppResult<RunReport>
where
    W: Write + Send + 'static,
{
    let operations = build_operations(command, service).await?;
    log::info!(
        "Prepared {} operation(s) for '{}'",
        operations.len(),
        command_name(command)
    );

    let engine = BatchExecutionEngine::new(service.client(), config.engine_config());
    let monitor = Arc::new(ProgressMonitor::new(
        operations.len(),
        config.display().failure_window(),
    ));

    let display_cancel = CancellationToken::new();
    let display = tokio::spawn(render_until_cancelled(
        monitor.clone(),
        config.display().refresh_interval(),
        display_cancel.clone(),
        out,
    ));

    let result = engine
        .run_with_cancel(operations, monitor.clone(), cancel)
        .await;

    display_cancel.cancel();
    // The run outcome stands even when the progress output broke.
    match display.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => log::error!("Progress display failed: {e}"),
        Err(e) => log::error!("Progress display task ended abnormally: {e}"),
    }

    Ok(RunReport {
        summary: result?,
        recent_failures: monitor.recent_failures(),
        failures_seen: monitor.failures_seen(),
    })
}

async fn build_operations(
    command: &Command,
    service: &SimulatedService,
) -> AppResult<Vec<Operation>> {
    let operations = match command {
        Command::Create { entity, count } => generate_records(entity, *count)
            .into_iter()
            .map(Operation::Create)
            .collect(),
        Command::Update {
            entity,
            limit,
            existing,
        } => {
            service.seed(entity, *existing);
            let records = fetch_targets(&service.client(), entity, *limit).await?;
            mark_modified(records)
                .into_iter()
                .map(Operation::Update)
                .collect()
        }
        Command::Delete {
            entity,
            limit,
            existing,
        } => {
            service.seed(entity, *existing);
            fetch_targets(&service.client(), entity, *limit)
                .await?
                .iter()
                .map(|record| Operation::Delete(record.to_ref()))
                .collect()
        }
        Command::Run { input } => read_operations(input)?,
    };
    Ok(operations)
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Create { .. } => "create",
        Command::Update { .. } => "update",
        Command::Delete { .. } => "delete",
        Command::Run { .. } => "run",
    }
}

/// Cancels `token` on Ctrl-C. The watcher exits once `token` is cancelled
/// from anywhere else.
pub fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => {
                        log::warn!("Interrupt received, finishing in-flight batches");
                        token.cancel();
                    }
                    Err(e) => log::error!("Failed to listen for Ctrl-C: {e}"),
                }
            }
        }
    })
}
