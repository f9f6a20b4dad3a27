use bulksync::app;
use bulksync::cli::Cli;
use bulksync::config;
use bulksync::error::AppError;
use bulksync::logger;
use bulksync::monitor::summary_report;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loaded = config::init_config(cli.config.as_deref());
    let Some(base) = loaded.config() else {
        let message = loaded
            .error_message()
            .unwrap_or("Unknown configuration error")
            .to_string();
        return Err(AppError::Config(message).into());
    };

    let app_config = base.clone().with_overrides(cli.batch_size, cli.sessions);
    if let Err(errors) = app_config.validate() {
        for error in &errors {
            eprintln!("{}\n", error.user_message());
        }
        return Err(AppError::Config(format!(
            "{} invalid configuration value(s)",
            errors.len()
        ))
        .into());
    }

    logger::setup_logger(app_config.logging()).map_err(AppError::from)?;
    println!("Logging to file: {}", app_config.logging().file());

    let report = app::execute(&cli.command, &app_config).await?;
    println!(
        "{}",
        summary_report(&report.summary, &report.recent_failures, report.failures_seen)
    );
    Ok(())
}
