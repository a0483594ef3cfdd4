use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::state::AppState;
use crate::SyncError;
use crate::ingest::Ingestion;
use crate::proto::{DeleteQuery, DeleteResponse, EmbedRequest, EmbedResponse, ErrorResponse};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(request_id: String, e: &SyncError) -> ApiError {
    let status =
        StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let error = match e {
        SyncError::Validation { message, .. } => message.clone(),
        other => other.to_string(),
    };
    (status, Json(ErrorResponse { error, code: e.error_code().to_string(), request_id }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Liveness banner
pub async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse { message: "RAG server is running".to_string() })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub embedder: String,
    pub store: String,
}

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        embedder: state.ingestion.embedder().name().to_string(),
        store: state.ingestion.store().name().to_string(),
    })
}

/// Embed one chunk and upsert it under its `(file, line)` identity
pub async fn embed_handler(
    State(state): State<AppState>,
    Json(req): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let start_time = std::time::Instant::now();
    counter!("ingest_embed_requests_total").increment(1);

    info!(
        request_id = %request_id,
        project = %req.metadata.project,
        file = %req.metadata.file,
        line = req.metadata.line,
        "Embed request received"
    );

    match state.ingestion.embed(req).await {
        Ok(()) => {
            info!(
                request_id = %request_id,
                processing_time_ms = start_time.elapsed().as_millis() as u64,
                "Chunk stored"
            );
            Ok(Json(EmbedResponse::stored()))
        }
        Err(e @ SyncError::Validation { .. }) => {
            warn!(request_id = %request_id, error = %e, "Rejected embed request");
            Err(api_error(request_id, &e))
        }
        Err(e) => {
            error!(request_id = %request_id, error = %e, "Embed request failed");
            Err(api_error(request_id, &e))
        }
    }
}

/// Remove every entry of one file
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    counter!("ingest_delete_requests_total").increment(1);

    if query.file.trim().is_empty() {
        let e = SyncError::validation("file", "File cannot be empty.");
        warn!(request_id = %request_id, "Rejected delete without file");
        return Err(api_error(request_id, &e));
    }

    match state.ingestion.delete(query.project.as_deref(), &query.file).await {
        Ok(removed) => Ok(Json(DeleteResponse::deleted(removed))),
        Err(e) => {
            error!(request_id = %request_id, file = %query.file, error = %e, "Delete request failed");
            Err(api_error(request_id, &e))
        }
    }
}

/// Prometheus exposition, when a recorder is installed
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
