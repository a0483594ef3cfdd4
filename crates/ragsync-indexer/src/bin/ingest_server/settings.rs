use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use ragsync_indexer::embedder::DEFAULT_EMBEDDING_DIM;
use ragsync_indexer::{
    Embedder, HashEmbedder, HttpEmbedder, InMemoryVectorStore, QdrantStore, QdrantStoreConfig,
    VectorStore,
};
use tracing::{info, warn};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Qdrant,
    Memory,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedderKind {
    Hash,
    Http,
}

/// Ingestion service settings; every flag can also come from the environment
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "INGEST_ADDR", default_value = "0.0.0.0:8000")]
    pub addr: SocketAddr,

    /// Vector store backend
    #[arg(long, env = "VECTOR_STORE", value_enum, default_value_t = StoreKind::Qdrant)]
    pub store: StoreKind,

    #[arg(long, env = "QDRANT_URL", default_value = "http://qdrant:6334")]
    pub qdrant_url: String,

    #[arg(long, env = "COLLECTION_NAME", default_value = "codebase_embeddings")]
    pub collection: String,

    /// Drop and recreate the collection before serving
    #[arg(long)]
    pub reset: bool,

    /// Embedding backend
    #[arg(long, env = "EMBEDDER", value_enum, default_value_t = EmbedderKind::Hash)]
    pub embedder: EmbedderKind,

    /// OpenAI-compatible embeddings endpoint
    #[arg(long, env = "EMBEDDING_URL")]
    pub embedding_url: Option<String>,

    #[arg(long, env = "EMBEDDING_MODEL", default_value = "intfloat/e5-small-v2")]
    pub embedding_model: String,

    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    pub embedding_api_key: Option<String>,

    #[arg(long, env = "EMBEDDING_DIM", default_value_t = DEFAULT_EMBEDDING_DIM)]
    pub embedding_dim: usize,

    /// Upper bound on each embedding request, in seconds
    #[arg(long, env = "EMBEDDING_TIMEOUT_SECS", default_value_t = 30)]
    pub embedding_timeout_secs: u64,
}

pub fn build_embedder(args: &ServerArgs) -> Result<Arc<dyn Embedder>> {
    match args.embedder {
        EmbedderKind::Hash => {
            warn!("Using hash embedder, similarity search will not be meaningful");
            Ok(Arc::new(HashEmbedder::new(args.embedding_dim)))
        }
        EmbedderKind::Http => {
            let url = args
                .embedding_url
                .clone()
                .ok_or_else(|| anyhow!("EMBEDDING_URL is required when EMBEDDER=http"))?;
            let embedder = HttpEmbedder::new(
                url,
                args.embedding_model.clone(),
                args.embedding_api_key.clone(),
                args.embedding_dim,
                Duration::from_secs(args.embedding_timeout_secs),
            )?;
            Ok(Arc::new(embedder))
        }
    }
}

pub async fn build_store(args: &ServerArgs, dimension: usize) -> Result<Arc<dyn VectorStore>> {
    match args.store {
        StoreKind::Memory => {
            info!("💾 Using in-memory vector store ({} dims)", dimension);
            Ok(Arc::new(InMemoryVectorStore::new(dimension)))
        }
        StoreKind::Qdrant => {
            let store = QdrantStore::connect(QdrantStoreConfig {
                url: args.qdrant_url.clone(),
                collection: args.collection.clone(),
                dimension,
                recreate: args.reset,
            })
            .await?;
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_defaults_match_deployment() {
        let fixture = ServerArgs::try_parse_from(["ingest-api"]).unwrap();

        assert_eq!(fixture.addr, "0.0.0.0:8000".parse::<SocketAddr>().unwrap());
        assert_eq!(fixture.collection, "codebase_embeddings");
        assert_eq!(fixture.embedding_dim, 384);
        assert!(!fixture.reset);
    }

    #[test]
    fn test_http_embedder_requires_url() {
        let fixture = ServerArgs::try_parse_from(["ingest-api", "--embedder", "http"]).unwrap();

        let actual = build_embedder(&fixture);

        assert!(actual.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_uses_embedder_dimension() {
        let fixture = ServerArgs::try_parse_from(["ingest-api", "--store", "memory"]).unwrap();

        let store = build_store(&fixture, 16).await.unwrap();

        assert_eq!(store.name(), "memory");
    }
}
