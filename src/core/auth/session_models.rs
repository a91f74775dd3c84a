use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// OAuth scope that grants full access to the user's Drive.
pub const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Tokens closer than this to expiry are treated as already expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// An authorized handle to the remote API.
///
/// The Drive client only ever reads `access_token`; the other fields matter to
/// the provider that produced the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// What we persist in the credential store between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl StoredCredentials {
    /// Build credentials from a fresh grant issued at `now`.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            expires_at: grant.expires_at(now),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            scope: grant.scope,
        }
    }

    /// Fold a refresh grant into existing credentials.
    ///
    /// Google only returns a refresh token on the first consent, so the stored one
    /// survives unless the grant carries a replacement.
    pub fn merge_refresh(&self, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        Self {
            expires_at: grant.expires_at(now),
            access_token: grant.access_token,
            refresh_token: grant.refresh_token.or_else(|| self.refresh_token.clone()),
            scope: grant.scope.or_else(|| self.scope.clone()),
        }
    }

    /// Whether the access token can still be used at `now`.
    ///
    /// A token without a recorded expiry is assumed stale, since we can't prove
    /// otherwise and refreshing is cheap.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS),
            None => false,
        }
    }

    pub fn to_session(&self) -> Session {
        Session {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// Response from an OAuth token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in.map(|secs| now + Duration::seconds(secs))
    }
}

/// Knobs for the interactive consent flow.
///
/// Passed explicitly to whoever runs the flow instead of living in a global.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsentOptions {
    /// Log the consent URL and each redirect even when the browser opens fine.
    pub debug: bool,
}
