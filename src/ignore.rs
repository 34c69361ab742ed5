//! Snapshot discovery - which files under a directory are workflow snapshots

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

pub struct IgnoreFilter {
    root: PathBuf,
    inner: Gitignore,
}

impl IgnoreFilter {
    pub fn new(root: &Path, extra_excludes: &[String]) -> Self {
        let mut builder = GitignoreBuilder::new(root);

        builder.add(root.join(".gitignore"));
        builder.add(root.join(".ignore"));

        let defaults = [
            "target/", "node_modules/", "dist/", "build/", "out/", "coverage/",
            ".git/", ".vscode/", ".idea/",
            "package.json", "package-lock.json", "tsconfig.json", "*.schema.json",
        ];
        for pattern in defaults {
            builder.add_line(None, pattern).ok();
        }

        for pattern in extra_excludes {
            if builder.add_line(None, pattern).is_err() {
                tracing::warn!("Ignoring invalid exclude pattern {:?}", pattern);
            }
        }

        Self {
            root: root.to_path_buf(),
            inner: builder.build().unwrap_or_else(|_| Gitignore::empty()),
        }
    }

    /// Matches the path or any of its parent directories. Paths outside the root never match.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        if !path.starts_with(&self.root) {
            return false;
        }
        self.inner.matched_path_or_any_parents(path, is_dir).is_ignore()
    }
}

pub fn is_snapshot(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// `path` itself when it is a file, otherwise every snapshot below it, sorted
pub fn find_snapshots(path: &Path, extra_excludes: &[String]) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let filter = IgnoreFilter::new(path, extra_excludes);
    let mut found: Vec<PathBuf> = WalkBuilder::new(path)
        .build()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .map(|entry| entry.into_path())
        .filter(|p| is_snapshot(p) && !filter.is_ignored(p, false))
        .collect();

    found.sort();
    tracing::debug!("Found {} snapshots under {}", found.len(), path.display());
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_find_snapshots_skips_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("drafts")).unwrap();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        fs::create_dir_all(root.join("flows")).unwrap();
        for file in [
            "a.json",
            "notes.txt",
            "package.json",
            "drafts/b.json",
            "node_modules/c.json",
            "flows/d.JSON",
        ] {
            fs::write(root.join(file), "{}").unwrap();
        }

        let found = find_snapshots(root, &["drafts/".to_string()]);
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.json", "flows/d.JSON"]);
    }

    #[test]
    fn test_single_file_is_returned_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("flow.txt");
        fs::write(&file, "{}").unwrap();
        assert_eq!(find_snapshots(&file, &[]), vec![file]);
    }

    #[test]
    fn test_paths_outside_root_are_not_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let filter = IgnoreFilter::new(dir.path(), &["*.json".to_string()]);
        assert!(filter.is_ignored(&dir.path().join("x.json"), false));
        assert!(!filter.is_ignored(Path::new("/elsewhere/x.json"), false));
    }
}
