//! File watcher that keeps the ingestion service's index in sync with a
//! source tree

use anyhow::Result;
use clap::Parser;
use ragsync_indexer::init_default_logging;
use tracing::info;

mod sync_cli;

use sync_cli::{Args, Commands, load_config, run_resync, run_watch};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_default_logging()?;

    let args = Args::parse();
    info!("🚀 Starting ragsync v{}", env!("CARGO_PKG_VERSION"));

    match args.command.unwrap_or_default() {
        Commands::Watch { overrides, initial_sync } => {
            let mut config = load_config(&args.config, &overrides)?;
            config.initial_sync |= initial_sync;
            run_watch(config).await
        }
        Commands::Resync { overrides } => {
            let config = load_config(&args.config, &overrides)?;
            run_resync(config).await
        }
    }
}
