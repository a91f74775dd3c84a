// In-memory implementation of DriveApi.
//
// Behaves like Drive for the calls we make (ids are assigned by the "service",
// duplicate titles are allowed, copies get fresh ids) so the publish workflow
// can be exercised end to end without a network.

use crate::core::publish::{
    DriveApi, DriveError, FileId, Media, NewFile, RemoteFailure, RemoteFile,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Everything the fake service remembers about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub id: FileId,
    pub title: String,
    pub description: Option<String>,
    pub mime_type: String,
    pub parent_id: String,
    pub content: Vec<u8>,
}

impl StoredFile {
    fn to_remote(&self) -> RemoteFile {
        RemoteFile {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            mime_type: Some(self.mime_type.clone()),
            parent_id: Some(self.parent_id.clone()),
        }
    }
}

pub struct InMemoryDrive {
    files: DashMap<FileId, StoredFile>,
    next_id: AtomicU64,
    /// Count of insert/copy/update calls that changed something.
    mutations: AtomicUsize,
    copy_failure: Mutex<Option<RemoteFailure>>,
    update_failure: Mutex<Option<RemoteFailure>>,
}

impl InMemoryDrive {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
            next_id: AtomicU64::new(1),
            mutations: AtomicUsize::new(0),
            copy_failure: Mutex::new(None),
            update_failure: Mutex::new(None),
        }
    }

    fn allocate_id(&self) -> FileId {
        FileId(format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    /// Put a file in place without counting it as a mutation.
    pub fn seed(&self, parent_id: &str, title: &str, mime_type: &str, content: &[u8]) -> FileId {
        let id = self.allocate_id();
        self.seed_with_id(id.as_str(), parent_id, title, mime_type, content);
        id
    }

    pub fn seed_with_id(
        &self,
        id: &str,
        parent_id: &str,
        title: &str,
        mime_type: &str,
        content: &[u8],
    ) {
        let id = FileId::new(id);
        self.files.insert(
            id.clone(),
            StoredFile {
                id,
                title: title.to_string(),
                description: None,
                mime_type: mime_type.to_string(),
                parent_id: parent_id.to_string(),
                content: content.to_vec(),
            },
        );
    }

    /// Make every following copy fail with `failure`.
    pub fn fail_copies_with(&self, failure: RemoteFailure) {
        if let Ok(mut slot) = self.copy_failure.lock() {
            *slot = Some(failure);
        }
    }

    /// Make every following content update fail with `failure`.
    pub fn fail_updates_with(&self, failure: RemoteFailure) {
        if let Ok(mut slot) = self.update_failure.lock() {
            *slot = Some(failure);
        }
    }

    pub fn get(&self, id: &FileId) -> Option<StoredFile> {
        self.files.get(id).map(|f| f.clone())
    }

    pub fn content(&self, id: &FileId) -> Option<Vec<u8>> {
        self.files.get(id).map(|f| f.content.clone())
    }

    /// Ids of files titled `title` in `parent_id`, in id order.
    pub fn find(&self, parent_id: &str, title: &str) -> Vec<FileId> {
        let mut ids: Vec<FileId> = self
            .files
            .iter()
            .filter(|f| f.parent_id == parent_id && f.title == title)
            .map(|f| f.id.clone())
            .collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn not_found(id: &FileId) -> RemoteFailure {
        RemoteFailure::from_response(
            404,
            serde_json::json!({
                "error": { "code": 404, "message": format!("File not found: {}", id) }
            })
            .to_string(),
        )
    }
}

impl Default for InMemoryDrive {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriveApi for InMemoryDrive {
    async fn list_by_title(&self, parent_id: &str, title: &str) -> Result<Vec<FileId>, DriveError> {
        Ok(self.find(parent_id, title))
    }

    async fn insert(&self, file: &NewFile, media: &Media) -> Result<RemoteFile, DriveError> {
        let stored = StoredFile {
            id: self.allocate_id(),
            title: file.title.clone(),
            description: Some(file.description.clone()),
            mime_type: media.mime_type.clone(),
            parent_id: file.parent_id.clone(),
            content: media.bytes.clone(),
        };
        let remote = stored.to_remote();
        self.files.insert(stored.id.clone(), stored);
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(remote)
    }

    async fn copy(&self, source: &FileId, title: &str, parent_id: &str) -> Result<RemoteFile, DriveError> {
        if let Some(failure) = self.copy_failure.lock().ok().and_then(|f| f.clone()) {
            return Err(DriveError::Copy(failure));
        }

        let original = self
            .get(source)
            .ok_or_else(|| DriveError::Copy(Self::not_found(source)))?;
        let copy = StoredFile {
            id: self.allocate_id(),
            title: title.to_string(),
            parent_id: parent_id.to_string(),
            ..original
        };
        let remote = copy.to_remote();
        self.files.insert(copy.id.clone(), copy);
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(remote)
    }

    async fn update_content(&self, file_id: &FileId, media: &Media) -> Result<RemoteFile, DriveError> {
        if let Some(failure) = self.update_failure.lock().ok().and_then(|f| f.clone()) {
            return Err(DriveError::Update(failure));
        }

        let mut entry = self
            .files
            .get_mut(file_id)
            .ok_or_else(|| DriveError::Update(Self::not_found(file_id)))?;
        entry.content = media.bytes.clone();
        entry.mime_type = media.mime_type.clone();
        let remote = entry.to_remote();
        drop(entry);

        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(remote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn media(content: &[u8]) -> Media {
        Media {
            mime_type: "text/plain".to_string(),
            bytes: content.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_copy_gets_fresh_id_and_keeps_content() {
        let drive = InMemoryDrive::new();
        let source = drive.seed("P1", "build.txt", "text/plain", b"v1");

        let copy = drive.copy(&source, "latest.txt", "P2").await.unwrap();

        assert_ne!(copy.id, source);
        assert_eq!(copy.parent_id.as_deref(), Some("P2"));
        assert_eq!(drive.content(&copy.id).unwrap(), b"v1");
        assert_eq!(drive.get(&source).unwrap().title, "build.txt");
        assert_eq!(drive.mutations(), 1);
    }

    #[tokio::test]
    async fn test_update_of_unknown_file_is_a_remote_failure() {
        let drive = InMemoryDrive::new();

        let err = drive
            .update_content(&FileId::new("nope"), &media(b"x"))
            .await
            .unwrap_err();

        assert!(matches!(err, DriveError::Update(ref f) if f.status == 404));
        assert_eq!(drive.mutations(), 0);
    }
}
