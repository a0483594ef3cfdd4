//! Request and response bodies of the ingestion HTTP API

use ragsync_domain::{Chunk, ChunkMetadata};
use serde::{Deserialize, Serialize};

/// `POST /embed` body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedRequest {
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl From<&Chunk> for EmbedRequest {
    fn from(chunk: &Chunk) -> Self {
        Self { text: chunk.text.clone(), metadata: chunk.metadata() }
    }
}

/// `POST /embed` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub status: String,
}

impl EmbedResponse {
    pub fn stored() -> Self {
        Self { status: "stored".to_string() }
    }
}

/// `DELETE /embed` query string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteQuery {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

/// `DELETE /embed` success body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    #[serde(default)]
    pub removed: u64,
}

impl DeleteResponse {
    pub fn deleted(removed: u64) -> Self {
        Self { status: "deleted".to_string(), removed }
    }
}

/// Error body returned by every endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    pub request_id: String,
}
