// =============================================================================
// SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// For unattended build machines where nobody can click through a consent page.
//
// **Setup:**
// 1. Create a service account in the Google Cloud console and enable the
//    Drive API for its project.
// 2. Create a JSON key for it and keep it somewhere private.
// 3. Share the upload folder and the "latest" folder with the service
//    account's email address (Editor access).
// 4. Point `GOOGLE_SERVICE_ACCOUNT_KEY` at the key file.
//
// Nothing is persisted: every run signs a fresh assertion.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::auth::{AuthError, Session, SessionProvider, TokenGrant, DRIVE_SCOPE};

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountCredentials {
    /// The service account email (used as issuer in JWT).
    client_email: String,

    /// The private key in PEM format.
    private_key: String,

    /// The token URI (where to exchange JWT for access token).
    token_uri: String,
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    /// At most one hour after `iat`.
    exp: i64,
}

pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    client: Client,
}

impl ServiceAccountAuth {
    /// Creates a new authenticator from a JSON key file path.
    pub async fn from_file(path: &Path) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            AuthError::ServiceAccount(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)
            .map_err(|e| AuthError::ServiceAccount(format!("invalid key file: {}", e)))?;
        Ok(Self {
            credentials,
            client: Client::new(),
        })
    }

    fn claims(&self, now: i64) -> JwtClaims {
        JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + 3600,
        }
    }
}

#[async_trait]
impl SessionProvider for ServiceAccountAuth {
    async fn obtain_session(&self) -> Result<Session, AuthError> {
        let now = Utc::now();

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| AuthError::ServiceAccount(format!("bad private key: {}", e)))?;
        let jwt = encode(&header, &self.claims(now.timestamp()), &key)
            .map_err(|e| AuthError::ServiceAccount(e.to_string()))?;

        let response = self
            .client
            .post(&self.credentials.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ServiceAccount(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange { status, body });
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| AuthError::ServiceAccount(e.to_string()))?;

        tracing::info!(account = %self.credentials.client_email, "Authorized as service account");
        Ok(Session {
            expires_at: grant.expires_in.map(|secs| now + Duration::seconds(secs)),
            access_token: grant.access_token,
            refresh_token: None,
        })
    }
}
