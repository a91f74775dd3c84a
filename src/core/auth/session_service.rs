// Session acquisition.
//
// The core only knows how to decide between "reuse", "refresh" and "ask the
// user". Talking to Google's token endpoint and reading/writing the credential
// file are infra concerns hidden behind the traits below.

use async_trait::async_trait;
use chrono::Utc;
use std::path::PathBuf;
use thiserror::Error;

use super::session_models::{ConsentOptions, Session, StoredCredentials, TokenGrant};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credential store {path} is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },
    #[error("Credential store error: {0}")]
    Store(String),
    #[error("Cannot load client secrets from {path}: {reason}")]
    Secrets { path: PathBuf, reason: String },
    #[error("Interactive authorization failed: {0}")]
    Consent(String),
    #[error("Authorization was declined: {0}")]
    ConsentDenied(String),
    #[error("Token exchange failed ({status}): {body}")]
    TokenExchange { status: u16, body: String },
    #[error("Refreshing the stored token failed ({status}): {body}. Delete the credential store to authorize again")]
    Refresh { status: u16, body: String },
    #[error("Service account authentication failed: {0}")]
    ServiceAccount(String),
}

/// Persistence for credentials between runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<StoredCredentials>, AuthError>;
    async fn save(&self, credentials: &StoredCredentials) -> Result<(), AuthError>;
}

/// The OAuth calls the session provider needs.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    /// Exchange a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;

    /// Ask the user for consent and return the resulting grant.
    async fn authorize(&self, options: &ConsentOptions) -> Result<TokenGrant, AuthError>;
}

/// Anything that can hand out an authorized session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn obtain_session(&self) -> Result<Session, AuthError>;
}

/// Session provider backed by a credential store and an installed-app flow.
pub struct StoredSessionProvider<S: CredentialStore, F: AuthorizationFlow> {
    store: S,
    flow: F,
    options: ConsentOptions,
}

impl<S: CredentialStore, F: AuthorizationFlow> StoredSessionProvider<S, F> {
    pub fn new(store: S, flow: F, options: ConsentOptions) -> Self {
        Self {
            store,
            flow,
            options,
        }
    }
}

#[async_trait]
impl<S, F> SessionProvider for StoredSessionProvider<S, F>
where
    S: CredentialStore,
    F: AuthorizationFlow,
{
    async fn obtain_session(&self) -> Result<Session, AuthError> {
        let now = Utc::now();

        let credentials = match self.store.load().await? {
            Some(stored) if stored.is_fresh(now) => {
                tracing::debug!("Reusing stored access token");
                return Ok(stored.to_session());
            }
            Some(stored) => match stored.refresh_token.as_deref() {
                Some(refresh_token) => {
                    tracing::info!("Stored access token expired, refreshing");
                    let grant = self.flow.refresh(refresh_token).await?;
                    stored.merge_refresh(grant, Utc::now())
                }
                None => {
                    tracing::warn!("Stored credentials have no refresh token, asking for consent");
                    let grant = self.flow.authorize(&self.options).await?;
                    StoredCredentials::from_grant(grant, Utc::now())
                }
            },
            None => {
                tracing::info!("No stored credentials, starting interactive authorization");
                let grant = self.flow.authorize(&self.options).await?;
                StoredCredentials::from_grant(grant, Utc::now())
            }
        };

        self.store.save(&credentials).await?;
        Ok(credentials.to_session())
    }
}
