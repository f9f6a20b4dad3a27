use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Bulk create, update and delete records with live progress.
#[derive(Debug, Parser)]
#[command(name = "bulksync", version, about)]
pub struct Cli {
    /// Configuration file (default: ./config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Operations per multi-operation request
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Concurrent service sessions
    #[arg(long, global = true)]
    pub sessions: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Generate new records and create them
    Create {
        #[arg(long)]
        entity: String,
        #[arg(long)]
        count: usize,
    },
    /// Retrieve every record of an entity and update it
    Update {
        #[arg(long)]
        entity: String,
        /// Only touch the first N retrieved records
        #[arg(long)]
        limit: Option<usize>,
        /// Records the simulated service starts with
        #[arg(long, default_value_t = 100)]
        existing: usize,
    },
    /// Retrieve every record of an entity and delete it
    Delete {
        #[arg(long)]
        entity: String,
        /// Only touch the first N retrieved records
        #[arg(long)]
        limit: Option<usize>,
        /// Records the simulated service starts with
        #[arg(long, default_value_t = 100)]
        existing: usize,
    },
    /// Execute a JSON array of operations
    Run {
        #[arg(long)]
        input: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_overrides_after_subcommand() {
        let cli = Cli::parse_from([
            "bulksync",
            "update",
            "--entity",
            "contact",
            "--limit",
            "5",
            "--sessions",
            "3",
        ]);
        assert_eq!(cli.sessions, Some(3));
        assert!(matches!(
            cli.command,
            Command::Update {
                limit: Some(5),
                existing: 100,
                ..
            }
        ));
    }
}
