use serde::Deserialize;
use std::path::Path;

use crate::core::auth::AuthError;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client registration, as downloaded from the Google Cloud console.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The console wraps the registration in an `installed` or `web` section.
#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let file: ClientSecretsFile = serde_json::from_str(json).map_err(|e| e.to_string())?;
        file.installed
            .or(file.web)
            .ok_or_else(|| "expected an \"installed\" or \"web\" section".to_string())
    }

    pub async fn load(path: &Path) -> Result<Self, AuthError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::Secrets {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Self::from_json(&text).map_err(|reason| AuthError::Secrets {
            path: path.to_path_buf(),
            reason,
        })
    }
}
