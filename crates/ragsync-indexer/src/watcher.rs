//! Change detection: a `notify` watcher feeding filtered change events into
//! a channel

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Event, EventKind, RecursiveMode, Watcher, recommended_watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::SyncError;

/// A file that may need re-indexing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    /// Absolute path of the changed file
    pub path: PathBuf,
    /// Watch root the path is relative to
    pub root: PathBuf,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), root: root.into() }
    }

    /// Path relative to the watch root with `/` separators, as stored in the
    /// index payload.
    pub fn relative_path(&self) -> crate::Result<String> {
        let relative = self.path.strip_prefix(&self.root).map_err(|_| {
            SyncError::validation(
                "path",
                format!(
                    "{} is not under watch root {}",
                    self.path.display(),
                    self.root.display()
                ),
            )
        })?;

        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        if parts.is_empty() {
            return Err(SyncError::validation("path", "path is the watch root itself"));
        }
        Ok(parts.join("/"))
    }
}

/// Static extension and ignore rules applied to every raw event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeFilter {
    extensions: Vec<String>,
    ignore: Vec<String>,
}

impl ChangeFilter {
    pub fn new(extensions: Vec<String>, ignore: Vec<String>) -> Self {
        Self { extensions, ignore }
    }

    /// Whether a path should be forwarded. Directories, paths with a suffix
    /// outside the allow-list, and paths containing an ignored substring are
    /// rejected.
    pub fn accepts(&self, path: &Path, is_dir: bool) -> bool {
        if is_dir {
            return false;
        }
        let path_str = path.to_string_lossy();
        if !self.extensions.iter().any(|ext| path_str.ends_with(ext.as_str())) {
            return false;
        }
        !self.ignore.iter().any(|ignored| path_str.contains(ignored.as_str()))
    }

    /// Turn a raw `notify` event into zero or more change events.
    pub fn changes(&self, event: &Event, root: &Path) -> Vec<ChangeEvent> {
        if !is_content_event(&event.kind) {
            trace!(kind = ?event.kind, "Dropping non-content event");
            return Vec::new();
        }

        event
            .paths
            .iter()
            .filter(|path| self.accepts(path, path.is_dir()))
            .map(|path| ChangeEvent::new(path.clone(), root))
            .collect()
    }
}

fn is_content_event(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_))
}

/// Recursive watcher over one root. Dropping it stops the watch.
pub struct FileWatcher {
    watcher: notify::RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`. Accepted changes are delivered on the returned
    /// receiver.
    pub fn start(
        root: &Path,
        filter: ChangeFilter,
    ) -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        info!("👀 Setting up directory watch for: {:?}", root);

        if !root.exists() {
            error!("❌ Watch path does not exist: {:?}", root);
            return Err(anyhow::anyhow!("Watch path does not exist: {:?}", root));
        }
        if !root.is_dir() {
            error!("❌ Watch path is not a directory: {:?}", root);
            return Err(anyhow::anyhow!("Watch path is not a directory: {:?}", root));
        }

        let (tx, rx) = mpsc::channel(1024);
        let callback_root = root.to_path_buf();
        let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for change in filter.changes(&event, &callback_root) {
                    debug!("📨 Change detected: {:?}", change.path);
                    if let Err(e) = tx.blocking_send(change) {
                        error!("❌ Failed to forward change event: {}", e);
                    }
                }
            }
            Err(e) => {
                error!("❌ File system watch error: {}", e);
            }
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| anyhow::anyhow!("Failed to watch directory: {}", e))?;

        info!("✅ Successfully watching directory: {:?}", root);
        Ok((Self { watcher, root: root.to_path_buf() }, rx))
    }

    pub fn stop(mut self) -> Result<()> {
        self.watcher.unwatch(&self.root)?;
        info!("🛑 Stopped watching {:?}", self.root);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use notify::event::{AccessKind, CreateKind, DataChange, ModifyKind, RemoveKind};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn filter() -> ChangeFilter {
        ChangeFilter::new(vec![".py".to_string()], vec!["__pycache__".to_string()])
    }

    fn event(kind: EventKind, paths: Vec<PathBuf>) -> Event {
        Event { kind, paths, attrs: Default::default() }
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let fixture = ChangeEvent::new("/repo/src/pkg/mod.py", "/repo");
        assert_eq!(fixture.relative_path().unwrap(), "src/pkg/mod.py");
    }

    #[test]
    fn test_relative_path_outside_root_fails() {
        let fixture = ChangeEvent::new("/elsewhere/mod.py", "/repo");
        assert!(fixture.relative_path().is_err());
    }

    #[test]
    fn test_rejects_ignored_directory() {
        let actual = filter().accepts(Path::new("/repo/__pycache__/foo.py"), false);
        assert!(!actual);
    }

    #[test]
    fn test_rejects_unwatched_extension() {
        let actual = filter().accepts(Path::new("/repo/foo.txt"), false);
        assert!(!actual);
    }

    #[test]
    fn test_rejects_directories() {
        let actual = filter().accepts(Path::new("/repo/pkg.py"), true);
        assert!(!actual);
    }

    #[test]
    fn test_accepts_watched_file() {
        let actual = filter().accepts(Path::new("/repo/src/foo.py"), false);
        assert!(actual);
    }

    #[test]
    fn test_changes_splits_multi_path_events() {
        let fixture = event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            vec![
                PathBuf::from("/repo/a.py"),
                PathBuf::from("/repo/b.txt"),
                PathBuf::from("/repo/__pycache__/c.py"),
                PathBuf::from("/repo/d.py"),
            ],
        );

        let actual = filter().changes(&fixture, Path::new("/repo"));

        let expected = vec![
            ChangeEvent::new("/repo/a.py", "/repo"),
            ChangeEvent::new("/repo/d.py", "/repo"),
        ];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_changes_forwards_create_and_remove() {
        let create = event(EventKind::Create(CreateKind::File), vec![PathBuf::from("/repo/a.py")]);
        let remove = event(EventKind::Remove(RemoveKind::File), vec![PathBuf::from("/repo/a.py")]);

        assert_eq!(filter().changes(&create, Path::new("/repo")).len(), 1);
        assert_eq!(filter().changes(&remove, Path::new("/repo")).len(), 1);
    }

    #[test]
    fn test_changes_drops_access_events() {
        let fixture = event(EventKind::Access(AccessKind::Any), vec![PathBuf::from("/repo/a.py")]);
        let actual = filter().changes(&fixture, Path::new("/repo"));
        assert!(actual.is_empty());
    }

    #[test]
    fn test_changes_skips_real_directories() {
        let fixture = TempDir::new().unwrap();
        let dir = fixture.path().join("pkg.py");
        std::fs::create_dir(&dir).unwrap();

        let actual = filter().changes(
            &event(EventKind::Create(CreateKind::Folder), vec![dir]),
            fixture.path(),
        );

        assert!(actual.is_empty());
    }

    #[test]
    fn test_start_rejects_missing_root() {
        let fixture = TempDir::new().unwrap();
        let actual = FileWatcher::start(&fixture.path().join("missing"), filter());
        assert!(actual.is_err());
    }
}
