//! RagSync - keeps a vector index in step with a watched source tree

pub mod api;
pub mod config;
pub mod embedder;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod proto;
pub mod resync;
pub mod scheduler;
pub mod store;
pub mod watcher;

pub use config::WatcherConfig;
pub use embedder::{Embedder, HashEmbedder, HttpEmbedder};
pub use errors::{Result, SyncError};
pub use ingest::{HttpIngestionClient, Ingestion, LocalIngestion};
pub use logging::{LoggingConfig, init_default_logging, init_production_logging};
pub use pipeline::{SyncOrchestrator, SyncOutcome, SyncReport, SyncStats};
pub use scheduler::{FileSync, FileSyncState, Submission, SyncScheduler};
pub use store::{InMemoryVectorStore, QdrantStore, QdrantStoreConfig, VectorStore};
pub use watcher::{ChangeEvent, ChangeFilter, FileWatcher};
