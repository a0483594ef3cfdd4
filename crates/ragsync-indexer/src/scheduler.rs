//! Per-file debouncing and serialisation of sync runs.
//!
//! Each file is in one of three states. `Idle` files start a run on the next
//! change. A change that arrives while a run is in flight marks the file
//! `RunningWithPending`, and any further changes collapse into that one
//! pending mark. When a run finishes with a pending mark exactly one follow-up
//! run starts and reads whatever the file holds at that moment. Runs for
//! different files never wait on each other.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::{Mutex, mpsc};
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info};

use crate::watcher::ChangeEvent;

/// Work executed for one file per run.
#[async_trait]
pub trait FileSync: Send + Sync + 'static {
    /// Bring the index in line with the file's current content. Failures
    /// are handled inside; the scheduler only cares that the run ended.
    async fn sync_file(&self, change: &ChangeEvent);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncState {
    Idle,
    Running,
    RunningWithPending,
}

/// What `submit` did with a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The file was idle and a run started
    Started,
    /// A run was in flight; a follow-up is now pending
    Deferred,
    /// A follow-up was already pending; nothing changed
    Coalesced,
}

/// Dispatches change events so that each file has at most one run in flight
/// and at most one pending.
#[derive(Clone)]
pub struct SyncScheduler {
    syncer: Arc<dyn FileSync>,
    // Absent key means Idle
    states: Arc<Mutex<HashMap<PathBuf, FileSyncState>>>,
    tracker: TaskTracker,
}

impl SyncScheduler {
    pub fn new(syncer: Arc<dyn FileSync>) -> Self {
        Self { syncer, states: Arc::new(Mutex::new(HashMap::new())), tracker: TaskTracker::new() }
    }

    /// Record a change for `change.path`, starting a run if the file is idle.
    pub async fn submit(&self, change: ChangeEvent) -> Submission {
        let mut states = self.states.lock().await;
        match states.get(&change.path).copied() {
            None | Some(FileSyncState::Idle) => {
                states.insert(change.path.clone(), FileSyncState::Running);
                drop(states);
                debug!(path = %change.path.display(), "Starting sync run");
                self.spawn_run(change);
                Submission::Started
            }
            Some(FileSyncState::Running) => {
                states.insert(change.path.clone(), FileSyncState::RunningWithPending);
                debug!(path = %change.path.display(), "Run in flight, follow-up pending");
                Submission::Deferred
            }
            Some(FileSyncState::RunningWithPending) => Submission::Coalesced,
        }
    }

    fn spawn_run(&self, change: ChangeEvent) {
        let syncer = self.syncer.clone();
        let states = self.states.clone();

        self.tracker.spawn(async move {
            loop {
                let run = AssertUnwindSafe(syncer.sync_file(&change)).catch_unwind().await;
                if run.is_err() {
                    error!(path = %change.path.display(), "❌ Sync run panicked");
                }

                let mut states = states.lock().await;
                if states.get(&change.path) == Some(&FileSyncState::RunningWithPending) {
                    states.insert(change.path.clone(), FileSyncState::Running);
                    debug!(path = %change.path.display(), "Starting follow-up run");
                } else {
                    states.remove(&change.path);
                    break;
                }
            }
        });
    }

    pub async fn state(&self, path: &Path) -> FileSyncState {
        self.states.lock().await.get(path).copied().unwrap_or(FileSyncState::Idle)
    }

    /// Number of files with a run in flight
    pub async fn active_files(&self) -> usize {
        self.states.lock().await.len()
    }

    /// Wait until every run started so far, follow-ups included, has ended.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Submit every event from `changes` until the channel closes, then wait
    /// for outstanding runs.
    pub async fn run(&self, mut changes: mpsc::Receiver<ChangeEvent>) {
        while let Some(change) = changes.recv().await {
            self.submit(change).await;
        }
        info!(active = self.active_files().await, "Change stream closed, draining runs");
        self.wait_idle().await;
    }
}
