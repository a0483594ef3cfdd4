//! In-memory vector store for development and testing

use std::collections::HashMap;

use async_trait::async_trait;
use ragsync_domain::{ChunkId, ChunkMetadata};
use tokio::sync::RwLock;
use tracing::debug;

use super::{IndexEntry, StoredChunk, VectorStore};
use crate::{Result, SyncError};

/// In-memory vector store keyed by chunk id
pub struct InMemoryVectorStore {
    dimension: usize,
    entries: RwLock<HashMap<ChunkId, IndexEntry>>,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self { dimension, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Cosine similarity search over every entry, for local inspection
    pub async fn search(&self, query: &[f32], limit: usize) -> Vec<(StoredChunk, f32)> {
        let entries = self.entries.read().await;
        let mut results: Vec<(StoredChunk, f32)> = entries
            .values()
            .map(|entry| (stored(entry), cosine_similarity(query, &entry.vector)))
            .collect();
        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        results
    }
}

fn matches(metadata: &ChunkMetadata, project: Option<&str>, file: &str) -> bool {
    metadata.file == file && project.is_none_or(|p| metadata.project == p)
}

fn stored(entry: &IndexEntry) -> StoredChunk {
    StoredChunk {
        id: entry.id.to_string(),
        metadata: entry.metadata.clone(),
        text: entry.text.clone(),
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, entry: IndexEntry) -> Result<()> {
        if entry.vector.len() != self.dimension {
            return Err(SyncError::vector_db(format!(
                "Embedding dimension {} does not match collection dimension {}",
                entry.vector.len(),
                self.dimension
            )));
        }

        debug!(id = %entry.id, file = %entry.metadata.file, line = entry.metadata.line, "Upserting entry");
        self.entries.write().await.insert(entry.id, entry);
        Ok(())
    }

    async fn delete_by_file(&self, project: Option<&str>, file: &str) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !matches(&entry.metadata, project, file));
        let removed = (before - entries.len()) as u64;

        debug!(file, removed, "Deleted entries by file");
        Ok(removed)
    }

    async fn entries_for_file(&self, project: Option<&str>, file: &str) -> Result<Vec<StoredChunk>> {
        let entries = self.entries.read().await;
        let mut found: Vec<StoredChunk> = entries
            .values()
            .filter(|entry| matches(&entry.metadata, project, file))
            .map(stored)
            .collect();
        found.sort_by_key(|chunk| chunk.metadata.line);
        Ok(found)
    }

    async fn reset(&self) -> Result<()> {
        self.entries.write().await.clear();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
