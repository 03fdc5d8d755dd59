//! `lsdembed` - build, query and inspect LSH index snapshots.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lsdembed_core::EngineConfig;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Approximate nearest-neighbour search over embeddings
#[derive(Parser, Debug)]
#[command(name = "lsdembed")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file, layered under LSDEMBED_* variables
    #[arg(short, long, global = true, env = "LSDEMBED_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a snapshot from JSON lines of {"id", "vector"}
    Build {
        /// Input JSONL file
        #[arg(short, long)]
        input: PathBuf,

        /// Output snapshot file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Query a snapshot, printing one JSON result per line
    Query {
        /// Snapshot file
        #[arg(long)]
        index: PathBuf,

        /// Probe vector as a JSON array
        #[arg(long)]
        vector: String,

        /// Number of results
        #[arg(short = 'k', long, default_value = "10")]
        k: usize,
    },

    /// Print row and table statistics as JSON
    Stats {
        /// Snapshot file
        #[arg(long)]
        index: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref()).context("invalid configuration")?;
    init_tracing(&config.logging.level);

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Build { input, output } => {
            let file = File::open(&input)
                .with_context(|| format!("cannot open input {}", input.display()))?;
            let rows = commands::build(&config, BufReader::new(file), &output)?;
            tracing::info!(rows, "done");
        }
        Commands::Query { index, vector, k } => {
            let engine = commands::open(&index)?;
            commands::query(&engine, &vector, k, &mut stdout)?;
        }
        Commands::Stats { index } => {
            let engine = commands::open(&index)?;
            commands::stats(&engine, &mut stdout)?;
        }
        Commands::Config => commands::show_config(&config, &mut stdout)?,
    }
    Ok(())
}
