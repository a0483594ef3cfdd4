use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use ragsync_indexer::WatcherConfig;
use tracing::{error, info};

use super::cli::Overrides;

/// Load the config file, apply command-line overrides and re-validate
pub fn load_config(path: &Path, overrides: &Overrides) -> Result<WatcherConfig> {
    // --watch-dir stands in for WATCH_DIR so loading succeeds without it
    let env = overrides.watch_dir.as_ref().map(|dir| {
        let mut env: HashMap<String, String> = std::env::vars().collect();
        env.insert("WATCH_DIR".to_string(), dir.display().to_string());
        env
    });

    let mut config = match WatcherConfig::from_sources(path, env) {
        Ok(config) => config,
        Err(e) => {
            error!("❌ Configuration failed: {}", e);
            return Err(e.into());
        }
    };

    let mut overridden = false;
    if let Some(project) = &overrides.project {
        config.project = project.clone();
        overridden = true;
    }
    if let Some(endpoint) = &overrides.endpoint {
        config.embed_server_url = endpoint.clone();
        overridden = true;
    }
    if let Some(size) = overrides.chunk_size {
        config.chunk_size =
            NonZeroUsize::new(size).ok_or_else(|| anyhow!("--chunk-size must be at least 1"))?;
        overridden = true;
    }

    if overridden {
        config.validate()?;
        info!("⚙️  Command-line overrides applied");
    }

    // Watcher events and the resync walk must agree on path keys
    config.watch_dir = config
        .watch_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", config.watch_dir.display()))?;
    Ok(config)
}
