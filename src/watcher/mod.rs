use crate::graph::WorkflowGraph;
use crate::ignore::{is_snapshot, IgnoreFilter};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

/// Change notifications for a watched snapshot
#[derive(Debug)]
pub enum SnapshotEvent<'a> {
    Updated(&'a Path, WorkflowGraph),
    Invalid(&'a Path, crate::Error),
    Removed(&'a Path),
}

/// Re-parses workflow snapshots when their content changes
pub struct SnapshotWatcher {
    path: PathBuf,
    root: PathBuf,
    filter: IgnoreFilter,
    hashes: HashMap<PathBuf, String>,
}

impl SnapshotWatcher {
    /// `path` is either one snapshot file or a directory of snapshots
    pub fn new(path: PathBuf, extra_excludes: &[String]) -> Self {
        let root = if path.is_file() {
            path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        } else {
            path.clone()
        };
        // Events arrive with absolute paths
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        let filter = IgnoreFilter::new(&root, extra_excludes);
        Self {
            path,
            root,
            filter,
            hashes: HashMap::new(),
        }
    }

    fn watches(&self, path: &Path) -> bool {
        if self.path.is_file() || !self.path.exists() {
            return path == self.path || path.file_name() == self.path.file_name();
        }
        is_snapshot(path) && !self.filter.is_ignored(path, false)
    }

    /// Whether `content` differs from what was last seen for `path`
    pub fn should_reload(&mut self, path: &Path, content: &str) -> bool {
        let hash = blake3::hash(content.as_bytes()).to_string();
        if self.hashes.get(path) == Some(&hash) {
            return false;
        }
        self.hashes.insert(path.to_path_buf(), hash);
        true
    }

    fn forget(&mut self, path: &Path) -> bool {
        self.hashes.remove(path).is_some()
    }

    /// Load `path` if its content changed since the last call
    pub fn reload(&mut self, path: &Path) -> Option<crate::Result<WorkflowGraph>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!("Skipping unreadable {}: {}", path.display(), e);
                return None;
            }
        };
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if !self.should_reload(&key, &content) {
            tracing::debug!("Unchanged: {}", path.display());
            return None;
        }
        Some(WorkflowGraph::from_json(&content))
    }

    pub fn run<F>(&mut self, mut on_event: F) -> anyhow::Result<()>
    where
        F: FnMut(SnapshotEvent<'_>),
    {
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;
        tracing::info!("Watching {} for changes", self.path.display());

        for res in rx {
            match res {
                Ok(event) => self.handle_event(event, &mut on_event),
                Err(e) => tracing::warn!("watch error: {:?}", e),
            }
        }

        Ok(())
    }

    fn handle_event<F>(&mut self, event: notify::Event, on_event: &mut F)
    where
        F: FnMut(SnapshotEvent<'_>),
    {
        use notify::EventKind;
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {
                for path in event.paths {
                    if !path.is_file() || !self.watches(&path) {
                        continue;
                    }
                    match self.reload(&path) {
                        Some(Ok(graph)) => on_event(SnapshotEvent::Updated(&path, graph)),
                        Some(Err(e)) => on_event(SnapshotEvent::Invalid(&path, e)),
                        None => {}
                    }
                }
            }
            EventKind::Remove(_) => {
                for path in event.paths {
                    if self.forget(&path) {
                        on_event(SnapshotEvent::Removed(&path));
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_content_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = SnapshotWatcher::new(dir.path().to_path_buf(), &[]);
        let path = dir.path().join("flow.json");

        assert!(watcher.should_reload(&path, "{}"));
        assert!(!watcher.should_reload(&path, "{}"));
        assert!(watcher.should_reload(&path, "{\"nodes\": []}"));
        assert!(watcher.forget(&path));
        assert!(watcher.should_reload(&path, "{\"nodes\": []}"));
    }

    #[test]
    fn test_reload_parses_changed_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.json");
        std::fs::write(&path, r#"{"nodes": [{"id": 1, "type": "Start", "name": "Start"}]}"#).unwrap();

        let mut watcher = SnapshotWatcher::new(dir.path().to_path_buf(), &[]);
        let graph = watcher.reload(&path).unwrap().unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert!(watcher.reload(&path).is_none());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(watcher.reload(&path), Some(Err(crate::Error::Json(_)))));
    }

    #[test]
    fn test_watches_only_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let watcher = SnapshotWatcher::new(root.clone(), &["drafts/".to_string()]);
        assert!(watcher.watches(&root.join("a.json")));
        assert!(!watcher.watches(&root.join("a.txt")));
        assert!(!watcher.watches(&root.join("drafts").join("b.json")));
    }
}
