//! Full-tree sweep used for `--initial-sync` and `ragsync resync`

use std::path::Path;

use ignore::WalkBuilder;
use tracing::{debug, info, warn};

use crate::watcher::{ChangeEvent, ChangeFilter};

/// Collect a change event for every eligible file under `root`.
///
/// `.gitignore` rules are honoured in addition to the filter; hidden files
/// are only skipped when the filter skips them.
pub fn collect_changes(root: &Path, filter: &ChangeFilter) -> Vec<ChangeEvent> {
    let walker = WalkBuilder::new(root).hidden(false).git_ignore(true).build();
    let mut changes = Vec::new();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if filter.accepts(entry.path(), is_dir) {
            debug!(path = %entry.path().display(), "Queued for resync");
            changes.push(ChangeEvent::new(entry.path(), root));
        }
    }

    changes.sort_by(|a, b| a.path.cmp(&b.path));
    info!("📝 Found {} files to sync under {:?}", changes.len(), root);
    changes
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_collect_changes_applies_filter() {
        let fixture = TempDir::new().unwrap();
        let root = fixture.path();
        fs::create_dir_all(root.join("src/__pycache__")).unwrap();
        fs::write(root.join("src/main.py"), "print(1)\n").unwrap();
        fs::write(root.join("src/readme.md"), "# hi\n").unwrap();
        fs::write(root.join("src/__pycache__/main.py"), "cached\n").unwrap();
        fs::write(root.join("top.py"), "x = 1\n").unwrap();
        let filter = ChangeFilter::new(vec![".py".to_string()], vec!["__pycache__".to_string()]);

        let actual: Vec<String> = collect_changes(root, &filter)
            .iter()
            .map(|c| c.relative_path().unwrap())
            .collect();

        let expected = vec!["src/main.py".to_string(), "top.py".to_string()];
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_collect_changes_skips_directories_matching_extension() {
        let fixture = TempDir::new().unwrap();
        fs::create_dir_all(fixture.path().join("pkg.py")).unwrap();
        let filter = ChangeFilter::new(vec![".py".to_string()], vec![]);

        let actual = collect_changes(fixture.path(), &filter);

        assert!(actual.is_empty());
    }
}
