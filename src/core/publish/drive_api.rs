use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use super::publish_models::{FileId, Media, NewFile, RemoteFile};
use crate::core::discovery::DiscoveryError;

/// A non-success answer from the remote service, kept whole for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub status: u16,
    pub message: String,
    pub body: String,
}

impl RemoteFailure {
    /// Pull the human-readable message out of a Google error body when there is one.
    pub fn from_response(status: u16, body: String) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| {
                json["error"]["message"]
                    .as_str()
                    .or_else(|| json["error_description"].as_str())
                    .or_else(|| json["error"].as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| "no error message in response".to_string());

        Self {
            status,
            message,
            body,
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}: {} (response: {})", self.status, self.message, self.body)
    }
}

#[derive(Debug, Error)]
pub enum DriveError {
    #[error("{count} files are called {title:?} in folder {parent_id}, refusing to guess which one is meant")]
    AmbiguousName {
        parent_id: String,
        title: String,
        count: usize,
    },
    #[error("Listing folder contents failed, {0}")]
    Lookup(RemoteFailure),
    #[error("Upload failed, {0}")]
    Upload(RemoteFailure),
    #[error("Copy failed, {0}")]
    Copy(RemoteFailure),
    #[error("Update failed, {0}")]
    Update(RemoteFailure),
    #[error("Request to the Drive API failed: {0}")]
    Transport(String),
    #[error("Unexpected response from the Drive API: {0}")]
    Decode(String),
    #[error("Cannot read {path}: {source}")]
    LocalFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("Uploaded {orphan} but the latest pointer was not updated: {source}")]
    PointerNotUpdated {
        orphan: FileId,
        #[source]
        source: Box<DriveError>,
    },
}

/// The four remote operations the publisher consumes.
///
/// Every call is scoped to whatever session the implementation was built with.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Ids of the children of `parent_id` whose title is exactly `title`.
    async fn list_by_title(&self, parent_id: &str, title: &str) -> Result<Vec<FileId>, DriveError>;

    /// Create a file with content in one multipart request.
    async fn insert(&self, file: &NewFile, media: &Media) -> Result<RemoteFile, DriveError>;

    /// Copy `source` under a new title and parent.
    async fn copy(&self, source: &FileId, title: &str, parent_id: &str) -> Result<RemoteFile, DriveError>;

    /// Replace the content of an existing file, keeping its id.
    async fn update_content(&self, file_id: &FileId, media: &Media) -> Result<RemoteFile, DriveError>;
}
