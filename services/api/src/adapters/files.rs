//! services/api/src/adapters/files.rs
//!
//! This module contains the local file store adapter, which implements the
//! `FileStore` port. Uploaded bytes live under a root directory partitioned
//! by user id, so concurrent users never touch each other's files. Fresh
//! v4 file ids make same-user collisions impossible.

use async_trait::async_trait;
use careprep_core::ports::{FileStore, PortError, PortResult};
use std::path::{Component, Path, PathBuf};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file store adapter backed by the local filesystem.
#[derive(Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Creates a new `LocalFileStore` rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Keeps only a safe alphanumeric extension from the original name.
    fn safe_extension(original_name: &str) -> Option<String> {
        let ext = Path::new(original_name).extension()?.to_str()?;
        if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(ext.to_ascii_lowercase())
        } else {
            None
        }
    }

    /// Resolves a storage-local path against the root, rejecting anything
    /// that would escape it. Paths come from our own records, but the
    /// record store is external and this check is cheap.
    fn resolve(&self, path: &str) -> PortResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(PortError::Unexpected(format!(
                "Refusing file path outside the upload root: {path}"
            )));
        }
        Ok(self.root.join(relative))
    }
}

//=========================================================================================
// `FileStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl FileStore for LocalFileStore {
    async fn save(
        &self,
        uid: &str,
        file_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> PortResult<String> {
        let file_name = match Self::safe_extension(original_name) {
            Some(ext) => format!("{file_id}.{ext}"),
            None => file_id.to_string(),
        };
        let relative = format!("{uid}/{file_name}");
        let full = self.resolve(&relative)?;

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unavailable(e.to_string()))?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        Ok(relative)
    }

    async fn read(&self, path: &str) -> PortResult<Vec<u8>> {
        let full = self.resolve(path)?;
        tokio::fs::read(&full).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                PortError::NotFound(format!("Stored file {path} not found"))
            }
            _ => PortError::Unavailable(e.to_string()),
        })
    }

    async fn remove(&self, path: &str) -> PortResult<()> {
        let full = self.resolve(path)?;
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            // A document delete must not fail because the file already vanished.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unavailable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    #[tokio::test]
    async fn save_and_read_round_trip() {
        let (_dir, store) = store();
        let path = store
            .save("user-1", "abc123", "report.PDF", b"hello bytes")
            .await
            .unwrap();
        assert_eq!(path, "user-1/abc123.pdf");
        let bytes = store.read(&path).await.unwrap();
        assert_eq!(bytes, b"hello bytes");
    }

    #[tokio::test]
    async fn missing_extension_is_dropped() {
        let (_dir, store) = store();
        let path = store.save("user-1", "abc123", "noext", b"x").await.unwrap();
        assert_eq!(path, "user-1/abc123");
    }

    #[tokio::test]
    async fn remove_tolerates_missing_file() {
        let (_dir, store) = store();
        store.remove("user-1/never-written.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn read_missing_file_is_not_found() {
        let (_dir, store) = store();
        let err = store.read("user-1/nothing.pdf").await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_paths_are_rejected() {
        let (_dir, store) = store();
        let err = store.read("../outside.txt").await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
    }
}
