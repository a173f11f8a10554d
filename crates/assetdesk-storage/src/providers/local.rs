//! Local filesystem storage provider.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio_util::io::ReaderStream;
use tracing::debug;

use assetdesk_core::error::{AppError, ErrorKind};
use assetdesk_core::result::AppResult;
use assetdesk_core::traits::storage::{ByteStream, StorageObjectMeta, StorageProvider};

/// Local filesystem storage provider.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Root directory for all stored files.
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// The disk root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    ///
    /// Rejects `..` and absolute components so no path escapes the root.
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let clean = Path::new(path.trim_start_matches('/'));
        if clean
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(AppError::validation(format!("Invalid storage path: {path}")));
        }
        Ok(self.root.join(clean))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

fn read_error(path: &str, verb: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("File not found: {path}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {verb} file: {path}"), e)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(fs::metadata(&self.root)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false))
    }

    async fn read(&self, path: &str) -> AppResult<ByteStream> {
        let full_path = self.resolve(path)?;
        let file = fs::File::open(&full_path)
            .await
            .map_err(|e| read_error(path, "open", e))?;

        let stream = ReaderStream::new(file);
        Ok(Box::pin(stream.map(|r| r.map(Bytes::from))))
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(path)?;
        let data = fs::read(&full_path)
            .await
            .map_err(|e| read_error(path, "read", e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        fs::write(&full_path, &data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write file: {path}"),
                e,
            )
        })?;

        debug!(path, bytes = data.len(), "Wrote file");
        Ok(())
    }

    async fn put_file(&self, path: &str, local: &Path) -> AppResult<u64> {
        let full_path = self.resolve(path)?;
        self.ensure_parent(&full_path).await?;

        let bytes = fs::copy(local, &full_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to store {} as {path}", local.display()),
                e,
            )
        })?;

        debug!(path, bytes, "Stored local file");
        Ok(bytes)
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to delete file: {path}"),
                e,
            )),
        }
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        self.ensure_parent(&to_path).await?;

        fs::rename(&from_path, &to_path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to rename {from} -> {to}"),
                e,
            )
        })?;
        Ok(())
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        fs::try_exists(&full_path).await.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to stat: {path}"), e)
        })
    }

    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta> {
        let full_path = self.resolve(path)?;
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| read_error(path, "stat", e))?;

        let last_modified = meta
            .modified()
            .ok()
            .map(chrono::DateTime::<chrono::Utc>::from);

        Ok(StorageObjectMeta {
            path: path.to_string(),
            size_bytes: meta.len(),
            last_modified,
            is_directory: meta.is_dir(),
        })
    }

    async fn remove_empty_dir(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path)?;
        if full_path == self.root {
            return Ok(false);
        }
        match fs::remove_dir(&full_path).await {
            Ok(()) => {
                debug!(path, "Removed empty directory");
                Ok(true)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::DirectoryNotEmpty
                ) =>
            {
                Ok(false)
            }
            Err(e) => Err(AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to remove directory: {path}"),
                e,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn provider() -> (tempfile::TempDir, LocalStorageProvider) {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path()).await.unwrap();
        (dir, provider)
    }

    #[tokio::test]
    async fn test_write_read_delete() {
        let (_dir, provider) = provider().await;

        let data = Bytes::from("hello world");
        provider.write("reports/a/file.csv", data.clone()).await.unwrap();
        assert!(provider.exists("reports/a/file.csv").await.unwrap());

        let read_back = provider.read_bytes("reports/a/file.csv").await.unwrap();
        assert_eq!(read_back, data);

        provider.delete("reports/a/file.csv").await.unwrap();
        assert!(!provider.exists("reports/a/file.csv").await.unwrap());
        // Deleting a missing file is not an error.
        provider.delete("reports/a/file.csv").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_file_and_rename() {
        let (_dir, provider) = provider().await;
        let local = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(local.path(), b"id,name\n1,Laptop\n").unwrap();

        let written = provider.put_file("reports/x.csv.part", local.path()).await.unwrap();
        assert_eq!(written, 17);
        provider.rename("reports/x.csv.part", "reports/x.csv").await.unwrap();
        assert!(!provider.exists("reports/x.csv.part").await.unwrap());
        assert_eq!(provider.metadata("reports/x.csv").await.unwrap().size_bytes, 17);
    }

    #[tokio::test]
    async fn test_remove_empty_dir_only_when_empty() {
        let (_dir, provider) = provider().await;
        provider.write("reports/r1/day/f.csv", Bytes::from("x")).await.unwrap();

        assert!(!provider.remove_empty_dir("reports/r1/day").await.unwrap());
        provider.delete("reports/r1/day/f.csv").await.unwrap();
        assert!(provider.remove_empty_dir("reports/r1/day").await.unwrap());
        assert!(!provider.remove_empty_dir("reports/r1/day").await.unwrap());
        assert!(provider.exists("reports/r1").await.unwrap());
    }

    #[tokio::test]
    async fn test_traversal_rejected() {
        let (_dir, provider) = provider().await;
        assert!(provider.read_bytes("../etc/passwd").await.is_err());
        assert!(provider.write("a/../../x", Bytes::from("x")).await.is_err());
    }
}
