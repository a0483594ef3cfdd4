//! Vector store abstraction and implementations

mod memory;
mod qdrant;

use async_trait::async_trait;
pub use memory::InMemoryVectorStore;
pub use qdrant::{QdrantStore, QdrantStoreConfig};
use ragsync_domain::{ChunkId, ChunkMetadata};
use serde::{Deserialize, Serialize};

use crate::Result;

/// The store's unit: identifier, vector and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: ChunkId,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
    /// Embedded text, kept so retrieval can return it
    pub text: String,
}

/// An entry as listed back from the store, without its vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredChunk {
    pub id: String,
    pub metadata: ChunkMetadata,
    pub text: String,
}

/// Storage backend behind the ingestion service.
///
/// Each call must be atomic on its own: an upsert is seen whole or not at
/// all, and a filtered delete removes every match in one step.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert the entry, replacing any entry with the same id
    async fn upsert(&self, entry: IndexEntry) -> Result<()>;

    /// Remove every entry whose payload `file` matches, limited to `project`
    /// when given. Returns how many entries were removed; zero is success.
    async fn delete_by_file(&self, project: Option<&str>, file: &str) -> Result<u64>;

    /// List the entries of one file, ordered by line
    async fn entries_for_file(&self, project: Option<&str>, file: &str) -> Result<Vec<StoredChunk>>;

    /// Drop every entry
    async fn reset(&self) -> Result<()>;

    fn name(&self) -> &str;
}
