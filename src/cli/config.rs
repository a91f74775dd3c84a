use clap::Parser;
use std::path::PathBuf;

use crate::core::auth::ConsentOptions;
use crate::core::publish::{PointerTarget, PublishRequest};

/// Name and version of the Drive API we talk to.
pub const API_NAME: &str = "drive";
pub const API_VERSION: &str = "v2";

/// Upload a build to Google Drive and point a "latest" file at it.
///
/// Exits successfully without touching anything when a file with the same
/// name is already in the parent folder.
#[derive(Debug, Parser)]
#[command(name = "publish", version)]
pub struct PublishArgs {
    /// Description stored on the uploaded file
    pub description: String,

    /// Id of the Drive folder that receives the upload
    pub parent_folder_id: String,

    /// Mime type of the uploaded content
    pub mime_type: String,

    /// Local file to upload; its file name becomes the remote title
    pub file_path: PathBuf,

    /// Id of the Drive folder holding the "latest" pointer
    pub latest_folder_id: String,

    /// Title of the "latest" pointer file
    pub latest_title: String,

    /// OAuth client registration downloaded from the Cloud console
    #[arg(long, env = "DRIVE_CLIENT_SECRETS", default_value = "client_secrets.json")]
    pub client_secrets: PathBuf,

    /// Where tokens are kept between runs [default: <program>-oauth2.json]
    #[arg(long, env = "DRIVE_CREDENTIAL_STORE")]
    pub credential_store: Option<PathBuf>,

    /// Directory for the cached API description
    #[arg(long, env = "DRIVE_DISCOVERY_CACHE_DIR", default_value = ".")]
    pub cache_dir: PathBuf,

    /// Debug log, appended to on every run
    #[arg(long, env = "DRIVE_LOG_FILE", default_value = "drive.log")]
    pub log_file: PathBuf,

    /// Authenticate with a service account key instead of interactive consent
    #[arg(long, env = "GOOGLE_SERVICE_ACCOUNT_KEY")]
    pub service_account_key: Option<PathBuf>,

    /// Log the consent URL and redirects during interactive authorization
    #[arg(long, env = "DRIVE_CONSENT_DEBUG")]
    pub consent_debug: bool,
}

/// Everything a run needs, with defaults resolved.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub request: PublishRequest,
    pub client_secrets: PathBuf,
    pub credential_store: PathBuf,
    pub cache_dir: PathBuf,
    pub log_file: PathBuf,
    pub service_account_key: Option<PathBuf>,
    pub consent: ConsentOptions,
}

impl PublisherConfig {
    /// `program` is how we were invoked; the default credential store sits next to it.
    pub fn from_args(args: PublishArgs, program: &str) -> Self {
        let credential_store = args
            .credential_store
            .unwrap_or_else(|| PathBuf::from(format!("{}-oauth2.json", program)));

        Self {
            request: PublishRequest {
                description: args.description,
                parent_id: args.parent_folder_id,
                mime_type: args.mime_type,
                local_path: args.file_path,
                pointer: PointerTarget {
                    parent_id: args.latest_folder_id,
                    title: args.latest_title,
                },
            },
            client_secrets: args.client_secrets,
            credential_store,
            cache_dir: args.cache_dir,
            log_file: args.log_file,
            service_account_key: args.service_account_key,
            consent: ConsentOptions {
                debug: args.consent_debug,
            },
        }
    }
}
