//! Quarry CLI: the main entry point.
//!
//! Commands:
//! - `run`     Load the dataset and answer every configured (or given) task
//! - `ask`     Answer a single question
//! - `schema`  Load the dataset and print the table layout
//! - `init`    Write a default config file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "quarry",
    about = "Quarry: ask questions about a CSV dataset in plain language",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.quarry/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer each task in turn (defaults to the tasks in the config file)
    Run {
        /// A task to run; repeat for several
        #[arg(short, long = "task")]
        tasks: Vec<String>,

        /// Override the per-task step budget
        #[arg(long)]
        max_steps: Option<u32>,
    },

    /// Answer a single question
    Ask {
        question: String,

        /// Override the step budget
        #[arg(long)]
        max_steps: Option<u32>,
    },

    /// Print the schema of the loaded table
    Schema {
        /// Table to describe (defaults to the configured table)
        #[arg(short, long)]
        table: Option<String>,
    },

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so answers on stdout stay clean
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run { tasks, max_steps } => commands::run::run(config_path, tasks, max_steps).await?,
        Commands::Ask {
            question,
            max_steps,
        } => commands::ask::run(config_path, question, max_steps).await?,
        Commands::Schema { table } => commands::schema::run(config_path, table).await?,
        Commands::Init { force } => commands::init::run(config_path, force)?,
    }

    Ok(())
}
