//! In-process ingestion over an embedder and a vector store

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::Ingestion;
use crate::embedder::Embedder;
use crate::proto::EmbedRequest;
use crate::store::{IndexEntry, VectorStore};
use crate::{Result, SyncError};

/// Prefix e5-family models expect on documents being indexed.
pub const PASSAGE_PREFIX: &str = "passage: ";

/// The logic behind the HTTP endpoints, usable without a network hop.
#[derive(Clone)]
pub struct LocalIngestion {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
}

impl LocalIngestion {
    pub fn new(embedder: Arc<dyn Embedder>, store: Arc<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Delete by file, optionally across every project
    pub async fn delete(&self, project: Option<&str>, file: &str) -> Result<u64> {
        let removed = self.store.delete_by_file(project, file).await?;
        info!(file, project = project.unwrap_or("*"), removed, "🗑️  Deleted file entries");
        Ok(removed)
    }
}

#[async_trait]
impl Ingestion for LocalIngestion {
    async fn embed(&self, request: EmbedRequest) -> Result<()> {
        let text = request.text.trim();
        if text.is_empty() {
            return Err(SyncError::validation("text", "Text cannot be empty."));
        }

        let input = if text.starts_with(PASSAGE_PREFIX) {
            text.to_string()
        } else {
            format!("{PASSAGE_PREFIX}{text}")
        };

        let vector = self.embedder.embed(&input).await?;
        let id = request.metadata.id();
        debug!(%id, file = %request.metadata.file, line = request.metadata.line, "Embedding stored");

        self.store
            .upsert(IndexEntry { id, vector, metadata: request.metadata, text: text.to_string() })
            .await
    }

    async fn delete_file(&self, project: &str, file: &str) -> Result<u64> {
        self.delete(Some(project), file).await
    }
}
