// The publish workflow: upload a build once, then point "latest" at it.
//
// Nothing in here knows about HTTP or OAuth. The service is handed a
// `DriveApi` that is already bound to an authorized session, which keeps the
// workflow testable against the in-memory drive.

use std::path::Path;

use super::drive_api::{DriveApi, DriveError};
use super::publish_models::{
    FileId, Media, NewFile, PointerOutcome, PointerTarget, PublishOutcome, PublishRequest,
};

pub struct PublishService<D: DriveApi> {
    drive: D,
}

impl<D: DriveApi> PublishService<D> {
    pub fn new(drive: D) -> Self {
        Self { drive }
    }

    /// Find the single file called `title` directly inside `parent_id`.
    ///
    /// More than one match means the folder is in a state we never produce, so
    /// this fails instead of picking one.
    pub async fn find_by_title(
        &self,
        parent_id: &str,
        title: &str,
    ) -> Result<Option<FileId>, DriveError> {
        let mut matches = self.drive.list_by_title(parent_id, title).await?;

        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            count => Err(DriveError::AmbiguousName {
                parent_id: parent_id.to_string(),
                title: title.to_string(),
                count,
            }),
        }
    }

    /// Create a new remote file from `local_path`. Does not look for duplicates.
    pub async fn upload(&self, file: &NewFile, local_path: &Path) -> Result<FileId, DriveError> {
        let media = read_media(local_path, &file.mime_type).await?;
        let created = self.drive.insert(file, &media).await?;

        tracing::info!(
            file_id = %created.id,
            parent_id = %file.parent_id,
            title = %file.title,
            bytes = media.bytes.len(),
            "Uploaded file"
        );
        tracing::debug!(
            title = ?created.title,
            mime_type = ?created.mime_type,
            parent_id = ?created.parent_id,
            description = ?created.description,
            "Drive recorded metadata"
        );
        Ok(created.id)
    }

    /// Make the pointer at `pointer` carry the content of the new build.
    ///
    /// An existing pointer keeps its id (and every link to it); a missing one is
    /// created as a copy of `new_file_id`.
    pub async fn publish_latest(
        &self,
        pointer: &PointerTarget,
        new_file_id: &FileId,
        mime_type: &str,
        local_path: &Path,
    ) -> Result<PointerOutcome, DriveError> {
        match self.find_by_title(&pointer.parent_id, &pointer.title).await? {
            Some(existing) => {
                let media = read_media(local_path, mime_type).await?;
                let updated = self.drive.update_content(&existing, &media).await?;
                tracing::info!(file_id = %updated.id, title = %pointer.title, "Updated latest pointer in place");
                Ok(PointerOutcome::Updated(updated.id))
            }
            None => {
                let copy = self
                    .drive
                    .copy(new_file_id, &pointer.title, &pointer.parent_id)
                    .await?;
                tracing::info!(
                    file_id = %copy.id,
                    source_id = %new_file_id,
                    parent_id = %pointer.parent_id,
                    title = %pointer.title,
                    "Created latest pointer"
                );
                Ok(PointerOutcome::Created(copy.id))
            }
        }
    }

    /// Full run: skip if already published, otherwise upload and move the pointer.
    pub async fn publish(&self, request: &PublishRequest) -> Result<PublishOutcome, DriveError> {
        let title = request.title();

        if let Some(existing) = self.find_by_title(&request.parent_id, &title).await? {
            tracing::info!(
                file_id = %existing,
                parent_id = %request.parent_id,
                title = %title,
                "Already published, nothing to do"
            );
            return Ok(PublishOutcome::AlreadyPublished(existing));
        }

        let new_file = NewFile {
            title,
            description: request.description.clone(),
            mime_type: request.mime_type.clone(),
            parent_id: request.parent_id.clone(),
        };
        let file_id = self.upload(&new_file, &request.local_path).await?;

        // No rollback past this point: the upload stays even if the pointer fails.
        let pointer = self
            .publish_latest(
                &request.pointer,
                &file_id,
                &request.mime_type,
                &request.local_path,
            )
            .await
            .map_err(|source| DriveError::PointerNotUpdated {
                orphan: file_id.clone(),
                source: Box::new(source),
            })?;

        Ok(PublishOutcome::Published { file_id, pointer })
    }
}

async fn read_media(path: &Path, mime_type: &str) -> Result<Media, DriveError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| DriveError::LocalFile {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(Media {
        mime_type: mime_type.to_string(),
        bytes,
    })
}
