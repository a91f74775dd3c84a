use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::core::discovery::{ApiDescription, DiscoveryCache, DiscoveryError};

/// Keeps one `<api>-<version>.cache` file per description in a directory.
pub struct FileDiscoveryCache {
    dir: PathBuf,
}

impl FileDiscoveryCache {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, api: &str, version: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.cache", api, version))
    }
}

#[async_trait]
impl DiscoveryCache for FileDiscoveryCache {
    async fn read(&self, api: &str, version: &str) -> Result<Option<ApiDescription>, DiscoveryError> {
        let path = self.path_for(api, version);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path)
            .await
            .map_err(|e| DiscoveryError::Cache(format!("{}: {}", path.display(), e)))?;
        let description = serde_json::from_slice(&bytes).map_err(|e| DiscoveryError::CorruptCache {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(description))
    }

    async fn write(
        &self,
        api: &str,
        version: &str,
        description: &ApiDescription,
    ) -> Result<(), DiscoveryError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DiscoveryError::Cache(format!("{}: {}", self.dir.display(), e)))?;

        let path = self.path_for(api, version);
        let bytes =
            serde_json::to_vec(description).map_err(|e| DiscoveryError::Cache(e.to_string()))?;
        fs::write(&path, bytes)
            .await
            .map_err(|e| DiscoveryError::Cache(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), "Cached API description");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::discovery::discovery_models::fixtures::drive_v2_document;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read_from_disk() {
        let dir = TempDir::new().unwrap();
        let description: ApiDescription =
            serde_json::from_value(drive_v2_document("https://www.googleapis.com/")).unwrap();

        let cache = FileDiscoveryCache::new(dir.path());
        assert!(cache.read("drive", "v2").await.unwrap().is_none());
        cache.write("drive", "v2", &description).await.unwrap();

        assert!(dir.path().join("drive-v2.cache").exists());
        let reloaded = FileDiscoveryCache::new(dir.path())
            .read("drive", "v2")
            .await
            .unwrap();
        assert_eq!(reloaded, Some(description));
    }

    #[tokio::test]
    async fn test_garbage_cache_is_corrupt() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("drive-v2.cache"), b"\x04\x08o:\x1aGoogle").unwrap();

        let err = FileDiscoveryCache::new(dir.path())
            .read("drive", "v2")
            .await
            .unwrap_err();

        assert!(matches!(err, DiscoveryError::CorruptCache { .. }));
    }
}
