use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use ragsync_indexer::config::DEFAULT_CONFIG_FILE;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// YAML configuration file
    #[arg(long, short, global = true, env = "RAGSYNC_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the tree and sync files as they change (default)
    Watch {
        #[command(flatten)]
        overrides: Overrides,

        /// Sync every eligible file once before watching
        #[arg(long)]
        initial_sync: bool,
    },
    /// Sync every eligible file once, then exit
    Resync {
        #[command(flatten)]
        overrides: Overrides,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Self::Watch { overrides: Overrides::default(), initial_sync: false }
    }
}

/// Values that take precedence over the config file and environment
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct Overrides {
    /// Directory to watch
    #[arg(long)]
    pub watch_dir: Option<PathBuf>,

    /// Project tag stored with every chunk
    #[arg(long)]
    pub project: Option<String>,

    /// Ingestion endpoint, e.g. http://localhost:8000/embed
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Lines per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,
}
