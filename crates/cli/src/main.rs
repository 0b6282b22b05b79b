//! IntelliCore CLI: the main entry point.
//!
//! Commands:
//! - `run`: Research a request and print the report
//! - `resume`: Continue an interrupted session from its checkpoint
//! - `ingest`: Load documents into the knowledge base
//! - `status`: Show configuration, tools, and checkpointed sessions
//! - `onboard`: Write the default configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "intellicore",
    about = "IntelliCore — multi-agent research orchestrator",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a request: decompose, research, write
    Run {
        /// The research request
        request: String,

        /// Session key for checkpointing (default: a new UUID)
        #[arg(short, long)]
        session: Option<String>,

        /// Print each stage as it completes
        #[arg(long)]
        stream: bool,
    },

    /// Resume a session from its last checkpoint
    Resume {
        session: String,

        #[arg(long)]
        stream: bool,
    },

    /// Load a file or directory of .txt files into the knowledge base
    Ingest {
        path: PathBuf,

        #[arg(long)]
        chunk_size: Option<usize>,

        #[arg(long)]
        chunk_overlap: Option<usize>,
    },

    /// Show system status
    Status,

    /// Initialize configuration
    Onboard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    match cli.log_format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init(),
    }

    match cli.command {
        Commands::Run {
            request,
            session,
            stream,
        } => commands::run::run(&request, session, stream).await?,
        Commands::Resume { session, stream } => commands::run::resume(&session, stream).await?,
        Commands::Ingest {
            path,
            chunk_size,
            chunk_overlap,
        } => commands::ingest::run(&path, chunk_size, chunk_overlap).await?,
        Commands::Status => commands::status::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
    }

    Ok(())
}
