//! The ingestion boundary: embed one chunk, delete one file

mod http;
mod local;

use async_trait::async_trait;
pub use http::HttpIngestionClient;
pub use local::{LocalIngestion, PASSAGE_PREFIX};

use crate::Result;
use crate::proto::EmbedRequest;

/// Operations the sync pipeline needs from the service owning the vector
/// store. Both must be idempotent from the caller's side: re-embedding the
/// same `(file, line)` overwrites, and deleting a file with no entries
/// succeeds.
#[async_trait]
pub trait Ingestion: Send + Sync {
    /// Insert or overwrite the entry for one chunk
    async fn embed(&self, request: EmbedRequest) -> Result<()>;

    /// Remove every entry of `file` within `project`; returns the number removed
    async fn delete_file(&self, project: &str, file: &str) -> Result<u64>;
}
