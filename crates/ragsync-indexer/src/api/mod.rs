//! HTTP surface of the ingestion service

mod handlers;
mod state;

use axum::Router;
use axum::routing::{get, post};
pub use handlers::{
    HealthResponse, RootResponse, delete_handler, embed_handler, health_handler, metrics_handler,
    root_handler,
};
pub use state::AppState;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the router serving `/`, `/health`, `/embed` and `/metrics`
pub fn ingest_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/embed", post(embed_handler).delete(delete_handler))
        .route("/metrics", get(metrics_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
