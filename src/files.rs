//! Storage for uploaded payloads.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

/// A payload that has been written to the backend.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub path: String,
    pub size: u64,
}

#[async_trait]
pub trait FileBackend: Send + Sync {
    /// Writes `data` and returns where it landed.
    async fn save(&self, original_name: &str, data: &[u8]) -> Result<StoredFile>;

    /// Removes a stored payload. A payload that is already gone counts as removed.
    async fn remove(&self, path: &str) -> Result<()>;
}

/// Keeps uploads as plain files under one directory.
pub struct LocalFileBackend {
    root: PathBuf,
}

impl LocalFileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create upload directory {}", root.display()))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl FileBackend for LocalFileBackend {
    async fn save(&self, original_name: &str, data: &[u8]) -> Result<StoredFile> {
        let path = self
            .root
            .join(format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original_name)));

        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write upload {}", path.display()))?;
        debug!(path = %path.display(), bytes = data.len(), "stored upload");

        Ok(StoredFile {
            path: path.to_string_lossy().into_owned(),
            size: data.len() as u64,
        })
    }

    async fn remove(&self, path: &str) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path, "upload already removed");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to remove upload {path}")),
        }
    }
}

/// Keeps the last path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_paths_and_odd_characters() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\deck v2.pdf"), "deck_v2.pdf");
        assert_eq!(sanitize_file_name("..."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[tokio::test]
    async fn save_then_remove_twice() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalFileBackend::new(dir.path().join("uploads")).unwrap();

        let stored = backend.save("notes.txt", b"hello").await.unwrap();
        assert_eq!(stored.size, 5);
        assert_eq!(std::fs::read(&stored.path).unwrap(), b"hello");

        backend.remove(&stored.path).await.unwrap();
        assert!(!std::path::Path::new(&stored.path).exists());
        backend.remove(&stored.path).await.unwrap();
    }
}
