use anyhow::Context;

use crate::cli::config::{PublisherConfig, API_NAME, API_VERSION};
use crate::core::auth::{SessionProvider, StoredSessionProvider};
use crate::core::discovery::DiscoveryLoader;
use crate::core::publish::{PointerOutcome, PublishOutcome, PublishService};
use crate::infra::auth::{FileCredentialStore, InstalledAppFlow, ServiceAccountAuth};
use crate::infra::discovery::{FileDiscoveryCache, HttpDiscoveryFetcher};
use crate::infra::drive::GoogleDriveClient;

/// Service account when a key is configured, otherwise stored tokens backed
/// by interactive consent.
async fn session_provider(config: &PublisherConfig) -> anyhow::Result<Box<dyn SessionProvider>> {
    if let Some(key_path) = &config.service_account_key {
        tracing::debug!(key = %key_path.display(), "Using service account credentials");
        let auth = ServiceAccountAuth::from_file(key_path).await?;
        return Ok(Box::new(auth));
    }

    let store = FileCredentialStore::new(&config.credential_store);
    Ok(Box::new(StoredSessionProvider::new(
        store,
        InstalledAppFlow::new(&config.client_secrets),
        config.consent,
    )))
}

/// Authenticate, describe the API, then upload and move the pointer.
pub async fn run(config: &PublisherConfig) -> anyhow::Result<PublishOutcome> {
    let session = session_provider(config)
        .await?
        .obtain_session()
        .await
        .context("could not obtain a Drive session")?;

    let loader = DiscoveryLoader::new(
        API_NAME,
        FileDiscoveryCache::new(&config.cache_dir),
        HttpDiscoveryFetcher::new(),
    );
    let api = loader
        .load_api_description(API_VERSION)
        .await
        .context("could not load the Drive API description")?;

    let client = GoogleDriveClient::new(api, &session)?;
    let outcome = PublishService::new(client)
        .publish(&config.request)
        .await
        .with_context(|| format!("publishing {} failed", config.request.local_path.display()))?;

    Ok(outcome)
}

/// One line for the console summarizing what happened.
pub fn summary(outcome: &PublishOutcome, config: &PublisherConfig) -> String {
    let title = config.request.title();
    match outcome {
        PublishOutcome::AlreadyPublished(id) => {
            format!("{} is already published ({}), nothing to do", title, id)
        }
        PublishOutcome::Published { file_id, pointer } => {
            let verb = match pointer {
                PointerOutcome::Updated(_) => "updated",
                PointerOutcome::Created(_) => "created",
            };
            format!(
                "published {} as {}; {} {} ({})",
                title,
                file_id,
                verb,
                config.request.pointer.title,
                pointer.file_id()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::config::PublishArgs;
    use crate::core::auth::{CredentialStore, StoredCredentials, DRIVE_SCOPE};
    use crate::core::publish::FileId;
    use chrono::{Duration, Utc};
    use clap::Parser;

    fn config() -> PublisherConfig {
        let args = PublishArgs::try_parse_from([
            "publish", "Build 7", "P1", "text/plain", "dist/build-7.txt", "P2", "latest.txt",
        ])
        .unwrap();
        PublisherConfig::from_args(args, "publish")
    }

    #[test]
    fn test_summary_for_existing_upload() {
        let line = summary(&PublishOutcome::AlreadyPublished(FileId::new("F9")), &config());
        assert_eq!(line, "build-7.txt is already published (F9), nothing to do");
    }

    #[test]
    fn test_summary_names_pointer_action() {
        let outcome = PublishOutcome::Published {
            file_id: FileId::new("F1"),
            pointer: PointerOutcome::Created(FileId::new("L1")),
        };
        assert_eq!(
            summary(&outcome, &config()),
            "published build-7.txt as F1; created latest.txt (L1)"
        );
    }

    #[tokio::test]
    async fn test_fresh_stored_token_needs_no_client_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.client_secrets = dir.path().join("client_secrets.json");
        config.credential_store = dir.path().join("publish-oauth2.json");
        FileCredentialStore::new(&config.credential_store)
            .save(&StoredCredentials {
                access_token: "ya29.stored".to_string(),
                refresh_token: Some("1//refresh".to_string()),
                expires_at: Some(Utc::now() + Duration::hours(1)),
                scope: Some(DRIVE_SCOPE.to_string()),
            })
            .await
            .unwrap();

        let session = session_provider(&config)
            .await
            .unwrap()
            .obtain_session()
            .await
            .unwrap();

        assert_eq!(session.access_token, "ya29.stored");
        assert!(!config.client_secrets.exists());
    }

    #[tokio::test]
    async fn test_first_consent_requires_client_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.client_secrets = dir.path().join("absent.json");
        config.credential_store = dir.path().join("store.json");

        let err = run(&config).await.unwrap_err();

        assert!(format!("{:#}", err).contains("absent.json"), "{err:#}");
        assert!(!config.credential_store.exists());
    }
}
