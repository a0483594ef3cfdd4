//! Ingestion service: embeds chunks and stores them in the vector store

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use ragsync_indexer::api::{AppState, ingest_router};
use ragsync_indexer::{Embedder, LocalIngestion, init_production_logging};
use tracing::info;

mod ingest_server;

use ingest_server::{ServerArgs, build_embedder, build_store, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_production_logging()?;

    let args = ServerArgs::parse();
    info!("🚀 Starting ingestion API v{}", env!("CARGO_PKG_VERSION"));

    let embedder = build_embedder(&args)?;
    let store = build_store(&args, embedder.dimension()).await?;
    let ingestion = LocalIngestion::new(embedder, store);

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    let app = ingest_router(AppState::new(ingestion).with_metrics(metrics));

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    info!("Ingestion API listening on {}", args.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            shutdown_signal().await;
        })
        .await?;

    info!("👋 Ingestion API shutdown complete");
    Ok(())
}
