use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::core::auth::{AuthError, CredentialStore, StoredCredentials};

/// JSON file holding the credentials of the single operator using this tool.
///
/// Not safe for concurrent runs sharing the same file: last writer wins.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<StoredCredentials>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(&self.path)
            .await
            .map_err(|e| AuthError::Store(format!("{}: {}", self.path.display(), e)))?;

        let credentials = serde_json::from_str(&text).map_err(|e| AuthError::CorruptStore {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Some(credentials))
    }

    async fn save(&self, credentials: &StoredCredentials) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AuthError::Store(e.to_string()))?;
        }

        let text = serde_json::to_string_pretty(credentials)
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let store_error = |e: std::io::Error| AuthError::Store(format!("{}: {}", self.path.display(), e));

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Owner-only from the moment the file exists
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&self.path).await.map_err(store_error)?;

        // A store created by an older run may still be world-readable
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let owner_only = std::fs::Permissions::from_mode(0o600);
            file.set_permissions(owner_only).await.map_err(store_error)?;
        }

        file.write_all(text.as_bytes()).await.map_err(store_error)?;
        file.flush().await.map_err(store_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_credentials_survive_reload() {
        let tmp = NamedTempFile::new().unwrap();
        let path = tmp.path().to_owned();
        drop(tmp);

        let store = FileCredentialStore::new(&path);
        assert!(store.load().await.unwrap().is_none());

        let credentials = StoredCredentials {
            access_token: "ya29.token".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            expires_at: Some(Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap()),
            scope: Some("https://www.googleapis.com/auth/drive".to_string()),
        };
        store.save(&credentials).await.unwrap();

        let reloaded = FileCredentialStore::new(&path).load().await.unwrap();
        assert_eq!(reloaded, Some(credentials));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "{ not json").unwrap();

        let err = FileCredentialStore::new(tmp.path()).load().await.unwrap_err();

        assert!(matches!(err, AuthError::CorruptStore { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publish-oauth2.json");
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let credentials = StoredCredentials {
            access_token: "ya29.token".to_string(),
            refresh_token: None,
            expires_at: None,
            scope: None,
        };
        let store = FileCredentialStore::new(&path);
        store.save(&credentials).await.unwrap();
        let fresh = dir.path().join("nested").join("store.json");
        FileCredentialStore::new(&fresh).save(&credentials).await.unwrap();

        for saved in [&path, &fresh] {
            let mode = std::fs::metadata(saved).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{}", saved.display());
        }
        assert_eq!(store.load().await.unwrap(), Some(credentials));
    }
}
