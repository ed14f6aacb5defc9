use async_trait::async_trait;
use glob::glob;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::StoreError;

/// Object storage as the pipeline consumes it. Keys are `/`-separated
/// paths; a "prefix" is a plain string prefix of the key, as in S3.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the bucket if it does not already exist.
    async fn ensure_bucket(&self) -> Result<(), StoreError>;

    /// Every object key under `prefix`, with any backend pagination fully
    /// drained before returning.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn copy(&self, src: &str, dst: &str) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Object storage rooted at a local directory, one subdirectory per bucket.
pub struct FsObjectStore {
    bucket_dir: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Self {
        Self {
            bucket_dir: root.as_ref().join(bucket),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.bucket_dir.join(key)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        path.strip_prefix(&self.bucket_dir)
            .ok()
            .map(|rel| rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn ensure_bucket(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.bucket_dir).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let pattern = format!("{}/**/*", self.bucket_dir.display());
        let mut keys = Vec::new();
        for entry in
            glob(&pattern).map_err(|e| StoreError::Backend(format!("bad list pattern: {e}")))?
        {
            let path = match entry {
                Ok(path) => path,
                Err(_) => continue,
            };
            if !path.is_file() {
                continue;
            }
            if let Some(key) = self.key_for(&path) {
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        match fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NoSuchKey(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn copy(&self, src: &str, dst: &str) -> Result<(), StoreError> {
        let dst_path = self.path_for(dst);
        if let Some(parent) = dst_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        match fs::copy(self.path_for(src), dst_path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NoSuchKey(src.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NoSuchKey(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn round_trips_objects_through_the_filesystem() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let store = FsObjectStore::new(root.path(), "egrid");
        store.ensure_bucket().await?;

        let path = root.path().join("egrid/incoming/2023/plants.csv");
        tokio::fs::create_dir_all(path.parent().unwrap()).await?;
        tokio::fs::write(&path, b"header\n").await?;

        let keys = store.list("incoming/").await?;
        assert_eq!(keys, ["incoming/2023/plants.csv"]);
        assert_eq!(store.get("incoming/2023/plants.csv").await?, b"header\n");

        store
            .copy("incoming/2023/plants.csv", "processed/2023/plants.csv")
            .await?;
        store.delete("incoming/2023/plants.csv").await?;

        assert!(store.list("incoming/").await?.is_empty());
        assert_eq!(store.list("processed/").await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn missing_objects_surface_as_no_such_key() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let store = FsObjectStore::new(root.path(), "egrid");
        store.ensure_bucket().await?;

        let err = store.get("incoming/nope.csv").await.unwrap_err();
        assert!(matches!(err, StoreError::NoSuchKey(_)));
        Ok(())
    }

    #[tokio::test]
    async fn prefixes_are_string_prefixes_not_directories() -> anyhow::Result<()> {
        let root = TempDir::new()?;
        let store = FsObjectStore::new(root.path(), "egrid");
        store.ensure_bucket().await?;

        let dir = root.path().join("egrid/incoming");
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("a.csv"), b"x").await?;
        tokio::fs::write(root.path().join("egrid/incoming-old.csv"), b"x").await?;

        assert_eq!(store.list("incoming/").await?, ["incoming/a.csv"]);
        assert_eq!(store.list("incoming").await?.len(), 2);
        Ok(())
    }
}
