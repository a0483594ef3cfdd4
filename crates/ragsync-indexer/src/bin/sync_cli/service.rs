use std::sync::Arc;

use anyhow::Result;
use ragsync_indexer::resync::collect_changes;
use ragsync_indexer::{
    FileWatcher, HttpIngestionClient, SyncOrchestrator, SyncScheduler, SyncStats, WatcherConfig,
};
use tracing::{error, info, warn};

use super::signals::shutdown_signal;

fn build_scheduler(config: &WatcherConfig) -> Result<(Arc<SyncOrchestrator>, SyncScheduler)> {
    let client = HttpIngestionClient::new(&config.embed_server_url, config.request_timeout)?;
    info!("🔗 Ingestion endpoint: {}", client.url());
    let orchestrator = Arc::new(SyncOrchestrator::new(Arc::new(client), config));
    let scheduler = SyncScheduler::new(orchestrator.clone());
    Ok((orchestrator, scheduler))
}

/// Submit every eligible file under the watch root
async fn submit_tree(config: &WatcherConfig, scheduler: &SyncScheduler) -> Result<usize> {
    let root = config.watch_dir.clone();
    let filter = config.change_filter();
    let changes = tokio::task::spawn_blocking(move || collect_changes(&root, &filter)).await?;
    let total = changes.len();
    for change in changes {
        scheduler.submit(change).await;
    }
    Ok(total)
}

fn log_stats(stats: &SyncStats) {
    info!("📈 Final Statistics:");
    info!("   🔄 Sync runs: {}", stats.runs);
    info!("   📁 Files indexed: {}", stats.files_indexed);
    info!("   🗑️  Files removed: {}", stats.files_removed);
    info!("   🧩 Chunks stored: {}", stats.chunks_stored);
    info!("   ❌ Chunks failed: {}", stats.chunks_failed);
    info!("   ⛔ Aborted runs: {}", stats.aborted_runs);
}

/// Watch the tree until a shutdown signal arrives
pub async fn run_watch(config: WatcherConfig) -> Result<()> {
    let (orchestrator, scheduler) = build_scheduler(&config)?;

    let (watcher, changes) = FileWatcher::start(&config.watch_dir, config.change_filter())?;

    if config.initial_sync {
        info!("🔍 Running initial sync...");
        let submitted = submit_tree(&config, &scheduler).await?;
        info!("📄 Queued {} files for initial sync", submitted);
    }

    info!("🔄 Waiting for file changes...");
    tokio::select! {
        _ = scheduler.run(changes) => {
            warn!("Change stream ended unexpectedly");
        }
        result = shutdown_signal() => {
            if let Err(e) = result {
                error!("❌ Failed to listen for shutdown signals: {}", e);
            }
            info!("🛑 Shutdown signal received, finishing in-flight runs...");
        }
    }

    if let Err(e) = watcher.stop() {
        warn!("Failed to stop watcher cleanly: {}", e);
    }
    scheduler.wait_idle().await;

    log_stats(&orchestrator.stats().await);
    info!("👋 ragsync shutdown complete");
    Ok(())
}

/// Sync every eligible file once and exit
pub async fn run_resync(config: WatcherConfig) -> Result<()> {
    let (orchestrator, scheduler) = build_scheduler(&config)?;

    info!("🔍 Resyncing {:?}", config.watch_dir);
    submit_tree(&config, &scheduler).await?;
    scheduler.wait_idle().await;

    let stats = orchestrator.stats().await;
    log_stats(&stats);
    if stats.aborted_runs > 0 || stats.chunks_failed > 0 {
        warn!("⚠️  Resync finished with failures; affected files sync again on their next change");
    } else {
        info!("✅ Resync complete");
    }
    Ok(())
}
