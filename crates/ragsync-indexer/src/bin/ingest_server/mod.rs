mod settings;

pub use settings::{ServerArgs, build_embedder, build_store};
use tracing::{error, info};

/// Resolve once SIGINT or SIGTERM arrives
pub async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    {
        let sigterm = signal::unix::signal(signal::unix::SignalKind::terminate());
        let sigint = signal::unix::signal(signal::unix::SignalKind::interrupt());
        match (sigterm, sigint) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                error!("❌ Failed to install signal handlers: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C");
    }
}
