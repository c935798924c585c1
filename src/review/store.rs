//! Persistence for reviewed artifacts.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Where accepted and rejected artifacts are written.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Write `content` to `path`, creating intermediate directories.
    async fn write(&self, path: &str, content: &str) -> Result<()>;

    /// Whether something is already stored at `path`.
    async fn exists(&self, path: &str) -> Result<bool>;
}

/// Content store backed by the local file system.
///
/// Relative paths resolve against `root`; absolute paths are used as-is.
#[derive(Debug, Clone)]
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn write(&self, path: &str, content: &str) -> Result<()> {
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        tokio::fs::write(&full, content)
            .await
            .with_context(|| format!("Failed to write file: {}", full.display()))?;
        tracing::debug!(path = %full.display(), bytes = content.len(), "Wrote artifact");
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path);
        tokio::fs::try_exists(&full)
            .await
            .with_context(|| format!("Failed to check file: {}", full.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_creates_intermediate_directories() {
        let dir = tempdir().unwrap();
        let store = FsContentStore::new(dir.path());

        store.write("docs/deep/x.md", "# hi").await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("docs/deep/x.md")).unwrap();
        assert_eq!(written, "# hi");
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let store = FsContentStore::new(dir.path());

        store.write("out.txt", "first").await.unwrap();
        store.write("out.txt", "second").await.unwrap();

        assert_eq!(
            std::fs::read_to_string(dir.path().join("out.txt")).unwrap(),
            "second"
        );
    }

    #[tokio::test]
    async fn test_exists_reflects_writes() {
        let dir = tempdir().unwrap();
        let store = FsContentStore::new(dir.path());

        assert!(!store.exists("docs/x.md").await.unwrap());
        store.write("docs/x.md", "# hi").await.unwrap();
        assert!(store.exists("docs/x.md").await.unwrap());
    }

    #[tokio::test]
    async fn test_absolute_path_ignores_root() {
        let root = tempdir().unwrap();
        let other = tempdir().unwrap();
        let store = FsContentStore::new(root.path());
        let target = other.path().join("abs.txt");

        store
            .write(target.to_str().unwrap(), "absolute")
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "absolute");
        assert!(!root.path().join("abs.txt").exists());
    }

    #[tokio::test]
    async fn test_write_into_file_as_directory_fails() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), "x").unwrap();
        let store = FsContentStore::new(dir.path());

        let err = store.write("blocker/child.txt", "y").await.unwrap_err();
        assert!(format!("{:#}", err).contains("blocker"));
    }
}
