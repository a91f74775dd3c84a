pub mod drive_api;
pub mod publish_models;
pub mod publish_service;

pub use drive_api::{DriveApi, DriveError, RemoteFailure};
pub use publish_models::{
    FileId, Media, NewFile, PointerOutcome, PointerTarget, PublishOutcome, PublishRequest,
    RemoteFile,
};
pub use publish_service::PublishService;
