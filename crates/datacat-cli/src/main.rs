mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "datacat",
    version,
    about = "Streaming record pipelines driven by a YAML task file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration YAML file
    #[arg(short, long, default_value = "datacat.yaml", global = true)]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task to completion
    Run {
        /// Name of the task to run
        task: String,
    },
    /// Validate configuration and construct every stage of a task
    Check {
        /// Name of the task to check
        task: String,
    },
    /// List configured tasks and their stage chains
    Tasks,
    /// List built-in stage types
    Stages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run { task } => commands::run::execute(&cli.config, &task).await,
        Commands::Check { task } => commands::check::execute(&cli.config, &task),
        Commands::Tasks => commands::tasks::execute(&cli.config),
        Commands::Stages => {
            commands::stages::execute();
            Ok(())
        }
    }
}
