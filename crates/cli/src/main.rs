//! PatentRAG CLI — the main entry point.
//!
//! Commands:
//! - `init`   — Write a default config and create the data directory
//! - `index`  — Chunk and embed the patent records into a vector index
//! - `chat`   — Interactive chat or single-message mode

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "patentrag",
    about = "PatentRAG — ask questions about a patent corpus",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration and data directory
    Init,

    /// Build the chunk index from the patent records
    Index {
        /// Override the records file (CSV, JSON array or JSON lines)
        #[arg(short, long)]
        records: Option<PathBuf>,

        /// Override where the index is written
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Chat about the indexed patents
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => commands::init::run()?,
        Commands::Index { records, output } => commands::index::run(records, output).await?,
        Commands::Chat { message } => commands::chat::run(message).await?,
    }

    Ok(())
}
