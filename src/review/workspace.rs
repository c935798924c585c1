//! Per-session temporary directory for staged preview assets.
//!
//! A [`Workspace`] owns its directory. [`Workspace::release`] removes it and
//! logs (never returns) any failure; dropping an unreleased workspace also
//! removes it, so early returns and panics cannot leak the directory.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::errors::ReviewError;

#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create `<root>/<prefix><random>`. The random suffix comes from
    /// `tempfile`, which retries on collision.
    pub fn acquire(root: &Path, prefix: &str) -> Result<Self, ReviewError> {
        let dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(root)
            .map_err(ReviewError::Workspace)?;
        let path = dir.path().to_path_buf();
        tracing::debug!(workspace = %path.display(), "Acquired workspace");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `contents` to `name` inside the workspace.
    pub fn stage(&self, name: &str, contents: &str) -> Result<PathBuf, ReviewError> {
        let file = self.path.join(name);
        std::fs::write(&file, contents).map_err(|source| ReviewError::Stage {
            path: file.clone(),
            source,
        })?;
        Ok(file)
    }

    /// Recursively delete the workspace. Failures are logged, not raised.
    pub fn release(mut self) {
        if let Some(dir) = self.dir.take() {
            match dir.close() {
                Ok(()) => {
                    tracing::debug!(workspace = %self.path.display(), "Released workspace");
                }
                Err(e) => {
                    tracing::warn!(
                        workspace = %self.path.display(),
                        error = %e,
                        "Failed to remove workspace"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_acquire_creates_prefixed_directory() {
        let root = tempdir().unwrap();
        let ws = Workspace::acquire(root.path(), "hitl-test-").unwrap();

        assert!(ws.path().is_dir());
        assert!(ws.path().starts_with(root.path()));
        let name = ws.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("hitl-test-"));
        assert!(name.len() > "hitl-test-".len());
    }

    #[test]
    fn test_acquire_twice_gives_distinct_directories() {
        let root = tempdir().unwrap();
        let a = Workspace::acquire(root.path(), "same-").unwrap();
        let b = Workspace::acquire(root.path(), "same-").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_acquire_in_missing_root_fails() {
        let root = tempdir().unwrap();
        let missing = root.path().join("does/not/exist");
        let err = Workspace::acquire(&missing, "x-").unwrap_err();
        assert!(matches!(err, ReviewError::Workspace(_)));
    }

    #[test]
    fn test_stage_writes_file() {
        let root = tempdir().unwrap();
        let ws = Workspace::acquire(root.path(), "stage-").unwrap();
        let file = ws.stage("index.html", "<p>hi</p>").unwrap();
        assert_eq!(file, ws.path().join("index.html"));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn test_release_removes_everything() {
        let root = tempdir().unwrap();
        let ws = Workspace::acquire(root.path(), "rel-").unwrap();
        ws.stage("index.html", "a").unwrap();
        std::fs::create_dir(ws.path().join("nested")).unwrap();
        std::fs::write(ws.path().join("nested/b.js"), "b").unwrap();
        let path = ws.path().to_path_buf();

        ws.release();
        assert!(!path.exists());
    }

    #[test]
    fn test_release_after_external_removal_does_not_panic() {
        let root = tempdir().unwrap();
        let ws = Workspace::acquire(root.path(), "gone-").unwrap();
        std::fs::remove_dir_all(ws.path()).unwrap();
        ws.release();
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempdir().unwrap();
        let path = {
            let ws = Workspace::acquire(root.path(), "drop-").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
