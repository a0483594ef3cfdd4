//! Sync orchestration: bring one file's index entries in line with its
//! current content

use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use metrics::counter;
use ragsync_domain::{ChunkId, chunk_file};
use tokio::sync::RwLock;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::WatcherConfig;
use crate::ingest::Ingestion;
use crate::proto::EmbedRequest;
use crate::scheduler::FileSync;
use crate::watcher::ChangeEvent;
use crate::{Result, SyncError};

/// Step of a sync run, used to label failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Delete,
    Chunk,
    Insert,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delete => "delete",
            Self::Chunk => "chunk",
            Self::Insert => "insert",
        }
    }
}

/// How a completed run left the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The file was read and its chunks submitted
    Indexed,
    /// The file no longer exists; its entries were deleted
    Removed,
}

/// What one run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub file: String,
    pub outcome: SyncOutcome,
    /// Entries removed by the delete phase
    pub deleted: u64,
    /// Chunks stored by the insert phase
    pub stored: usize,
    /// Start lines of chunks whose embed call failed
    pub failed_lines: Vec<usize>,
}

/// Running totals across all runs
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncStats {
    pub runs: u64,
    pub files_indexed: u64,
    pub files_removed: u64,
    pub chunks_stored: u64,
    pub chunks_failed: u64,
    pub aborted_runs: u64,
}

/// Executes delete, chunk and insert for one file at a time.
///
/// Deleting first means a file that shrank or whose chunk boundaries moved
/// never keeps entries from its previous version. Between the delete and the
/// last insert the file is under-represented in the index.
#[derive(Clone)]
pub struct SyncOrchestrator {
    ingestion: Arc<dyn Ingestion>,
    project: String,
    chunk_size: NonZeroUsize,
    embed_concurrency: usize,
    stats: Arc<RwLock<SyncStats>>,
}

impl SyncOrchestrator {
    pub fn new(ingestion: Arc<dyn Ingestion>, config: &WatcherConfig) -> Self {
        Self {
            ingestion,
            project: config.project.clone(),
            chunk_size: config.chunk_size,
            embed_concurrency: config.embed_concurrency.max(1),
            stats: Arc::new(RwLock::new(SyncStats::default())),
        }
    }

    pub async fn stats(&self) -> SyncStats {
        self.stats.read().await.clone()
    }

    /// Run delete, chunk and insert for the file behind `change`.
    ///
    /// A failed delete aborts the run with the previous entries intact. A
    /// failed read aborts after the delete, leaving the file unindexed.
    /// Failed inserts are reported but do not abort the run.
    pub async fn sync(&self, change: &ChangeEvent) -> Result<SyncReport> {
        let start_time = Instant::now();
        let file = change.relative_path()?;
        counter!("ragsync_sync_runs_total").increment(1);
        self.stats.write().await.runs += 1;

        let deleted = match self.ingestion.delete_file(&self.project, &file).await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!(file = %file, error = %e, "❌ Delete phase failed, keeping previous entries");
                self.record_abort(SyncPhase::Delete).await;
                return Err(e);
            }
        };
        debug!(file = %file, deleted, "Delete phase complete");

        let content = match tokio::fs::read_to_string(&change.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(file = %file, deleted, "🗑️  File removed, entries cleared");
                self.stats.write().await.files_removed += 1;
                return Ok(SyncReport {
                    file,
                    outcome: SyncOutcome::Removed,
                    deleted,
                    stored: 0,
                    failed_lines: Vec::new(),
                });
            }
            Err(e) => {
                error!(file = %file, error = %e, "❌ Failed to read file, left unindexed");
                self.record_abort(SyncPhase::Chunk).await;
                return Err(SyncError::file_read_with_source(file, e));
            }
        };

        let chunks = chunk_file(&self.project, &file, &content, self.chunk_size);
        debug!(file = %file, chunks = chunks.len(), "Chunk phase complete");

        let requests: Vec<(usize, ChunkId, EmbedRequest)> = chunks
            .iter()
            .map(|chunk| (chunk.start_line, chunk.id(), EmbedRequest::from(chunk)))
            .collect();
        let results: Vec<(usize, ChunkId, Result<()>)> = stream::iter(requests)
            .map(|(line, id, request)| {
                let ingestion = self.ingestion.clone();
                async move { (line, id, ingestion.embed(request).await) }
            })
            .buffer_unordered(self.embed_concurrency)
            .collect()
            .await;

        let mut failed_lines = Vec::new();
        for (line, id, result) in results {
            if let Err(e) = result {
                warn!(
                    file = %file,
                    line,
                    %id,
                    retryable = e.is_retryable(),
                    error = %e,
                    "⚠️  Failed to store chunk"
                );
                failed_lines.push(line);
            }
        }
        failed_lines.sort_unstable();
        let stored = chunks.len() - failed_lines.len();

        counter!("ragsync_chunks_submitted_total").increment(chunks.len() as u64);
        if !failed_lines.is_empty() {
            counter!("ragsync_chunks_failed_total").increment(failed_lines.len() as u64);
            counter!("ragsync_sync_failures_total", "phase" => SyncPhase::Insert.as_str())
                .increment(1);
            warn!(
                file = %file,
                stored,
                failed = failed_lines.len(),
                "Index under-represents file until its next change"
            );
        }

        {
            let mut stats = self.stats.write().await;
            stats.files_indexed += 1;
            stats.chunks_stored += stored as u64;
            stats.chunks_failed += failed_lines.len() as u64;
        }

        info!(
            file = %file,
            deleted,
            stored,
            failed = failed_lines.len(),
            duration_ms = start_time.elapsed().as_millis() as u64,
            "✅ File synced"
        );

        Ok(SyncReport { file, outcome: SyncOutcome::Indexed, deleted, stored, failed_lines })
    }

    async fn record_abort(&self, phase: SyncPhase) {
        counter!("ragsync_sync_failures_total", "phase" => phase.as_str()).increment(1);
        self.stats.write().await.aborted_runs += 1;
    }
}

#[async_trait]
impl FileSync for SyncOrchestrator {
    async fn sync_file(&self, change: &ChangeEvent) {
        let span = info_span!("sync", path = %change.path.display(), project = %self.project);
        // Failures were logged with their phase; the file waits for its next change
        if let Err(e) = self.sync(change).instrument(span).await {
            debug!(path = %change.path.display(), error = %e, "Sync run aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use ragsync_domain::ChunkMetadata;
    use tempfile::TempDir;

    use super::*;

    /// Records every call; fails the calls it is told to fail.
    #[derive(Default)]
    struct RecordingIngestion {
        calls: Mutex<Vec<String>>,
        fail_delete: bool,
        fail_lines: Vec<usize>,
    }

    impl RecordingIngestion {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Ingestion for RecordingIngestion {
        async fn embed(&self, request: EmbedRequest) -> Result<()> {
            let ChunkMetadata { file, line, .. } = &request.metadata;
            self.calls.lock().unwrap().push(format!("embed {file}:{line} {:?}", request.text));
            if self.fail_lines.contains(line) {
                return Err(SyncError::transport_status("embed", 503, "unavailable"));
            }
            Ok(())
        }

        async fn delete_file(&self, project: &str, file: &str) -> Result<u64> {
            self.calls.lock().unwrap().push(format!("delete {project}/{file}"));
            if self.fail_delete {
                return Err(SyncError::transport_status("delete", 500, "down"));
            }
            Ok(0)
        }
    }

    fn setup(ingestion: Arc<RecordingIngestion>) -> (TempDir, SyncOrchestrator) {
        let dir = TempDir::new().unwrap();
        let config = WatcherConfig::new(dir.path())
            .project("proj")
            .chunk_size(NonZeroUsize::new(2).unwrap())
            .embed_concurrency(1usize);
        (dir, SyncOrchestrator::new(ingestion, &config))
    }

    fn change(root: &Path, name: &str) -> ChangeEvent {
        ChangeEvent::new(root.join(name), root)
    }

    #[tokio::test]
    async fn test_sync_deletes_then_embeds_each_chunk() {
        let ingestion = Arc::new(RecordingIngestion::default());
        let (dir, fixture) = setup(ingestion.clone());
        std::fs::write(dir.path().join("foo.py"), "line1\nline2\nline3\n").unwrap();

        let actual = fixture.sync(&change(dir.path(), "foo.py")).await.unwrap();

        assert_eq!(actual.outcome, SyncOutcome::Indexed);
        assert_eq!(actual.stored, 2);
        assert_eq!(
            ingestion.calls(),
            vec![
                "delete proj/foo.py".to_string(),
                "embed foo.py:1 \"line1\\nline2\"".to_string(),
                "embed foo.py:3 \"line3\"".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_chunks_are_never_submitted() {
        let ingestion = Arc::new(RecordingIngestion::default());
        let (dir, fixture) = setup(ingestion.clone());
        std::fs::write(dir.path().join("gaps.py"), "a\n\n\n  \nb\n").unwrap();

        fixture.sync(&change(dir.path(), "gaps.py")).await.unwrap();

        let embeds: Vec<String> =
            ingestion.calls().into_iter().filter(|c| c.starts_with("embed")).collect();
        assert_eq!(
            embeds,
            vec!["embed gaps.py:1 \"a\"".to_string(), "embed gaps.py:5 \"b\"".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_delete_aborts_before_reading() {
        let ingestion = Arc::new(RecordingIngestion { fail_delete: true, ..Default::default() });
        let (dir, fixture) = setup(ingestion.clone());
        std::fs::write(dir.path().join("foo.py"), "line1\n").unwrap();

        let actual = fixture.sync(&change(dir.path(), "foo.py")).await;

        assert!(matches!(actual, Err(SyncError::Transport { .. })));
        assert_eq!(ingestion.calls(), vec!["delete proj/foo.py".to_string()]);
        assert_eq!(fixture.stats().await.aborted_runs, 1);
    }

    #[tokio::test]
    async fn test_unreadable_file_aborts_after_delete() {
        let ingestion = Arc::new(RecordingIngestion::default());
        let (dir, fixture) = setup(ingestion.clone());
        std::fs::write(dir.path().join("bin.py"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

        let actual = fixture.sync(&change(dir.path(), "bin.py")).await;

        assert!(matches!(actual, Err(SyncError::FileRead { .. })));
        assert_eq!(ingestion.calls(), vec!["delete proj/bin.py".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_file_is_reported_as_removed() {
        let ingestion = Arc::new(RecordingIngestion::default());
        let (dir, fixture) = setup(ingestion.clone());

        let actual = fixture.sync(&change(dir.path(), "nofile.py")).await.unwrap();

        assert_eq!(actual.outcome, SyncOutcome::Removed);
        assert_eq!(ingestion.calls(), vec!["delete proj/nofile.py".to_string()]);
        assert_eq!(fixture.stats().await.files_removed, 1);
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_block_siblings() {
        let ingestion = Arc::new(RecordingIngestion { fail_lines: vec![3], ..Default::default() });
        let (dir, fixture) = setup(ingestion.clone());
        std::fs::write(dir.path().join("foo.py"), "1\n2\n3\n4\n5\n").unwrap();

        let actual = fixture.sync(&change(dir.path(), "foo.py")).await.unwrap();

        assert_eq!(actual.stored, 2);
        assert_eq!(actual.failed_lines, vec![3]);
        let embeds = ingestion.calls().into_iter().filter(|c| c.starts_with("embed")).count();
        assert_eq!(embeds, 3);
    }

    #[tokio::test]
    async fn test_sync_file_runs_on_spawned_task_with_concurrent_embeds() {
        let ingestion = Arc::new(RecordingIngestion::default());
        let dir = TempDir::new().unwrap();
        let config = WatcherConfig::new(dir.path())
            .project("proj")
            .chunk_size(NonZeroUsize::new(1).unwrap())
            .embed_concurrency(4usize);
        let orchestrator = SyncOrchestrator::new(ingestion.clone(), &config);
        std::fs::write(dir.path().join("foo.py"), "1\n2\n3\n4\n5\n6\n").unwrap();
        let fixture: Arc<dyn FileSync> = Arc::new(orchestrator.clone());
        let event = change(dir.path(), "foo.py");

        tokio::spawn(async move { fixture.sync_file(&event).await }).await.unwrap();

        let mut actual: Vec<String> =
            ingestion.calls().into_iter().filter(|c| c.starts_with("embed")).collect();
        actual.sort();
        let expected: Vec<String> =
            (1..=6).map(|n| format!("embed foo.py:{n} \"{n}\"")).collect();
        assert_eq!(actual, expected);
        assert_eq!(orchestrator.stats().await.chunks_stored, 6);
    }

    #[tokio::test]
    async fn test_path_outside_root_is_rejected_without_calls() {
        let ingestion = Arc::new(RecordingIngestion::default());
        let (dir, fixture) = setup(ingestion.clone());
        let other = TempDir::new().unwrap();

        let actual = fixture.sync(&ChangeEvent::new(other.path().join("x.py"), dir.path())).await;

        assert!(matches!(actual, Err(SyncError::Validation { .. })));
        assert!(ingestion.calls().is_empty());
    }
}
