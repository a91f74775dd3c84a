use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Opaque identifier assigned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file record as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: FileId,
    pub title: String,
    pub description: Option<String>,
    pub mime_type: Option<String>,
    pub parent_id: Option<String>,
}

/// Metadata for a file we are about to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub title: String,
    pub description: String,
    pub mime_type: String,
    pub parent_id: String,
}

/// File content plus the type it should be served as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Where the "latest" pointer lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerTarget {
    pub parent_id: String,
    pub title: String,
}

/// Everything one publish run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishRequest {
    pub description: String,
    pub parent_id: String,
    pub mime_type: String,
    pub local_path: PathBuf,
    pub pointer: PointerTarget,
}

impl PublishRequest {
    /// The remote title is the local file name without its directories.
    pub fn title(&self) -> String {
        title_for(&self.local_path)
    }
}

pub fn title_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// How the pointer ended up pointing at the new build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerOutcome {
    /// An existing pointer had its content replaced; the id is unchanged.
    Updated(FileId),
    /// No pointer existed, so the upload was copied under the pointer title.
    Created(FileId),
}

impl PointerOutcome {
    pub fn file_id(&self) -> &FileId {
        match self {
            PointerOutcome::Updated(id) | PointerOutcome::Created(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A file with this title was already in the parent folder; nothing was touched.
    AlreadyPublished(FileId),
    Published {
        file_id: FileId,
        pointer: PointerOutcome,
    },
}
