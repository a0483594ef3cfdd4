//! Qdrant-backed vector store

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_config::Config as VectorConfig;
use qdrant_client::qdrant::{
    Condition, CountPointsBuilder, CreateCollectionBuilder, CreateFieldIndexCollectionBuilder,
    DeletePointsBuilder, Distance, FieldType, Filter, PointId, PointStruct, ScrollPointsBuilder,
    UpsertPointsBuilder, Value, VectorParams, VectorsConfig,
};
use qdrant_client::{Payload, Qdrant};
use ragsync_domain::ChunkMetadata;
use tracing::{debug, info, warn};

use super::{IndexEntry, StoredChunk, VectorStore};
use crate::{Result, SyncError};

const SCROLL_PAGE: u32 = 256;

/// Connection settings for [`QdrantStore`]
#[derive(Debug, Clone)]
pub struct QdrantStoreConfig {
    pub url: String,
    pub collection: String,
    pub dimension: usize,
    /// Drop and recreate the collection on startup
    pub recreate: bool,
}

pub struct QdrantStore {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantStore {
    pub async fn connect(config: QdrantStoreConfig) -> Result<Self> {
        info!("🔗 Connecting to Qdrant at: {}", config.url);
        let client = Qdrant::from_url(&config.url)
            .build()
            .map_err(|e| SyncError::vector_db_with_source("Failed to connect to Qdrant", e))?;

        let store = Self { client, collection: config.collection, dimension: config.dimension };

        if config.recreate {
            store.recreate_collection().await?;
        } else if !store.client.collection_exists(&store.collection).await? {
            info!("📝 Creating new collection: {}", store.collection);
            store.create_collection().await?;
        } else {
            let existing = store.existing_dimension().await?;
            if needs_recreate(&store.collection, existing, store.dimension)? {
                store.recreate_collection().await?;
            }
        }

        Ok(store)
    }

    async fn existing_dimension(&self) -> Result<Option<usize>> {
        let info = self.client.collection_info(&self.collection).await?;
        let size = info
            .result
            .and_then(|r| r.config)
            .and_then(|c| c.params)
            .and_then(|p| p.vectors_config)
            .and_then(|v| v.config)
            .and_then(|config| match config {
                VectorConfig::Params(params) => Some(params.size as usize),
                VectorConfig::ParamsMap(_) => None,
            });
        Ok(size)
    }

    async fn create_collection(&self) -> Result<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
                    VectorsConfig {
                        config: Some(VectorConfig::Params(VectorParams {
                            size: self.dimension as u64,
                            distance: Distance::Cosine.into(),
                            ..Default::default()
                        })),
                    },
                ),
            )
            .await?;

        // Deletes filter on `file`, so index it
        if let Err(e) = self
            .client
            .create_field_index(CreateFieldIndexCollectionBuilder::new(
                self.collection.clone(),
                "file",
                FieldType::Keyword,
            ))
            .await
        {
            warn!("Failed to create payload index on file: {}", e);
        }
        Ok(())
    }

    async fn recreate_collection(&self) -> Result<()> {
        info!("🗑️  Recreating collection: {}", self.collection);
        if let Err(e) = self.client.delete_collection(&self.collection).await {
            warn!("Failed to delete collection (may not exist): {}", e);
        }
        self.create_collection().await?;
        info!("✅ Collection recreated with {} dimensions", self.dimension);
        Ok(())
    }
}

/// Decide what to do with an existing collection. A mismatched size is
/// recreated; an unreadable vector config is left alone and reported.
fn needs_recreate(collection: &str, existing: Option<usize>, dimension: usize) -> Result<bool> {
    match existing {
        Some(size) if size == dimension => {
            info!("✅ Collection {} matches dimension {}", collection, size);
            Ok(false)
        }
        Some(size) => {
            warn!(
                "🔄 Collection has dimension {} but embedder produces {}, recreating",
                size, dimension
            );
            Ok(true)
        }
        None => Err(SyncError::vector_db(format!(
            "Could not determine vector dimension of collection {collection}; \
             restart with --reset to recreate it"
        ))),
    }
}

fn file_filter(project: Option<&str>, file: &str) -> Filter {
    let mut conditions = vec![Condition::matches("file", file.to_string())];
    if let Some(project) = project {
        conditions.push(Condition::matches("project", project.to_string()));
    }
    Filter::must(conditions)
}

fn entry_payload(entry: &IndexEntry) -> Payload {
    let mut payload = Payload::new();
    payload.insert("project", entry.metadata.project.clone());
    payload.insert("file", entry.metadata.file.clone());
    payload.insert("line", entry.metadata.line as i64);
    payload.insert("text", entry.text.clone());
    payload
}

fn point_id_to_string(id: &PointId) -> Option<String> {
    match id.point_id_options.as_ref()? {
        PointIdOptions::Uuid(uuid) => Some(uuid.clone()),
        PointIdOptions::Num(n) => Some(n.to_string()),
    }
}

/// Convert a Qdrant payload back into a listed chunk
fn payload_to_stored(id: String, payload: &HashMap<String, Value>) -> Result<StoredChunk> {
    let get_string = |key: &str| -> Result<String> {
        payload
            .get(key)
            .and_then(|v| match v.kind {
                Some(Kind::StringValue(ref s)) => Some(s.clone()),
                _ => None,
            })
            .ok_or_else(|| SyncError::validation(key, "Missing or invalid payload field"))
    };
    let line = payload
        .get("line")
        .and_then(|v| match v.kind {
            Some(Kind::IntegerValue(n)) => usize::try_from(n).ok(),
            _ => None,
        })
        .ok_or_else(|| SyncError::validation("line", "Missing or invalid payload field"))?;

    Ok(StoredChunk {
        id,
        metadata: ChunkMetadata { project: get_string("project")?, file: get_string("file")?, line },
        text: get_string("text").unwrap_or_default(),
    })
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn upsert(&self, entry: IndexEntry) -> Result<()> {
        if entry.vector.len() != self.dimension {
            return Err(SyncError::vector_db(format!(
                "Embedding dimension {} does not match collection dimension {}",
                entry.vector.len(),
                self.dimension
            )));
        }

        let payload = entry_payload(&entry);
        let point = PointStruct::new(entry.id.to_string(), entry.vector, payload);
        self.client
            .upsert_points(UpsertPointsBuilder::new(self.collection.clone(), vec![point]).wait(true))
            .await
            .map_err(|e| SyncError::vector_db_with_source("Failed to upsert point", e))?;

        debug!(id = %entry.id, "✅ Upserted point");
        Ok(())
    }

    async fn delete_by_file(&self, project: Option<&str>, file: &str) -> Result<u64> {
        let filter = file_filter(project, file);

        // Callers serialize syncs per file, so nothing else writes this
        // file's points between the count and the delete.
        let removed = self
            .client
            .count(
                CountPointsBuilder::new(self.collection.clone())
                    .filter(filter.clone())
                    .exact(true),
            )
            .await?
            .result
            .map(|r| r.count)
            .unwrap_or(0);

        self.client
            .delete_points(
                DeletePointsBuilder::new(self.collection.clone())
                    .points(filter)
                    .wait(true),
            )
            .await
            .map_err(|e| SyncError::vector_db_with_source("Failed to delete points by file", e))?;

        debug!(file, removed, "🗑️  Deleted points by file");
        Ok(removed)
    }

    async fn entries_for_file(&self, project: Option<&str>, file: &str) -> Result<Vec<StoredChunk>> {
        let filter = file_filter(project, file);
        let mut found = Vec::new();
        let mut offset: Option<PointId> = None;

        loop {
            let mut request = ScrollPointsBuilder::new(self.collection.clone())
                .filter(filter.clone())
                .limit(SCROLL_PAGE)
                .with_payload(true)
                .with_vectors(false);
            if let Some(next) = offset.take() {
                request = request.offset(next);
            }

            let response = self.client.scroll(request).await?;
            for point in response.result {
                let Some(id) = point.id.as_ref().and_then(point_id_to_string) else {
                    warn!("Skipping point without id");
                    continue;
                };
                match payload_to_stored(id, &point.payload) {
                    Ok(chunk) => found.push(chunk),
                    Err(e) => warn!("Skipping point with unreadable payload: {}", e),
                }
            }

            match response.next_page_offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        found.sort_by_key(|chunk| chunk.metadata.line);
        Ok(found)
    }

    async fn reset(&self) -> Result<()> {
        self.recreate_collection().await
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
