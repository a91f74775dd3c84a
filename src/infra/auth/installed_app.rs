// =============================================================================
// INSTALLED-APP OAUTH FLOW
// =============================================================================
//
// Google's flow for command-line tools: open the consent page in a browser,
// catch the redirect on a loopback port, and swap the authorization code for
// tokens. PKCE and a random `state` protect the code exchange.
//
// **First run on a new machine:**
// 1. Download the OAuth client JSON ("Desktop app") from the Google Cloud
//    console and save it as `client_secrets.json` (or point
//    `DRIVE_CLIENT_SECRETS` at it).
// 2. Run the publisher. A browser opens; approve the Drive scope.
// 3. The tokens land in the credential store and later runs reuse them.
//
// If the browser cannot be opened (headless box, broken launcher) the consent
// URL is logged; paste it into any browser that can reach this machine's
// loopback address. Set `DRIVE_CONSENT_DEBUG=1` to log it unconditionally.
//
// If a refresh ever fails with `invalid_grant`, delete the credential store
// and run again to repeat the consent.

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, OnceCell};
use url::Url;

use super::client_secrets::ClientSecrets;
use crate::core::auth::{AuthError, AuthorizationFlow, ConsentOptions, TokenGrant, DRIVE_SCOPE};

/// How long the loopback server may keep draining connections after the redirect.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

// =============================================================================
// PKCE
// =============================================================================

/// Proof key for the code exchange (RFC 7636, S256).
struct Pkce {
    verifier: String,
    challenge: String,
}

impl Pkce {
    fn generate() -> Self {
        Self::from_verifier(random_token(64))
    }

    fn from_verifier(verifier: String) -> Self {
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

// =============================================================================
// LOOPBACK REDIRECT
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct RedirectParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Redirect {
    Code { code: String, state: String },
    Denied(String),
    /// A hit on `/` that carries neither a code nor an error.
    Ignored,
}

impl From<RedirectParams> for Redirect {
    fn from(params: RedirectParams) -> Self {
        match (params.code, params.error) {
            (_, Some(error)) => Redirect::Denied(error),
            (Some(code), None) => Redirect::Code {
                code,
                state: params.state.unwrap_or_default(),
            },
            (None, None) => Redirect::Ignored,
        }
    }
}

type ConsentResult = Result<String, AuthError>;

/// Shared by the redirect handler; the first decisive redirect wins.
#[derive(Clone)]
struct RedirectListener {
    expected_state: Arc<String>,
    debug: bool,
    outcome: Arc<Mutex<Option<oneshot::Sender<ConsentResult>>>>,
}

impl RedirectListener {
    fn deliver(&self, outcome: ConsentResult) {
        let sender = self.outcome.lock().ok().and_then(|mut slot| slot.take());
        if let Some(sender) = sender {
            let _ = sender.send(outcome);
        }
    }
}

async fn receive_redirect(
    State(listener): State<RedirectListener>,
    Query(params): Query<RedirectParams>,
) -> (StatusCode, &'static str) {
    if listener.debug {
        tracing::info!(
            has_code = params.code.is_some(),
            state = ?params.state,
            error = ?params.error,
            "Consent redirect received"
        );
    }

    match Redirect::from(params) {
        Redirect::Code { code, state } if state == *listener.expected_state => {
            listener.deliver(Ok(code));
            (StatusCode::OK, "Authorization complete. You can close this window.")
        }
        Redirect::Code { .. } => {
            listener.deliver(Err(AuthError::Consent(
                "redirect state did not match the consent request".to_string(),
            )));
            (
                StatusCode::BAD_REQUEST,
                "Authorization state did not match; start again.",
            )
        }
        Redirect::Denied(error) => {
            listener.deliver(Err(AuthError::ConsentDenied(error)));
            (StatusCode::OK, "Authorization was declined.")
        }
        Redirect::Ignored => (StatusCode::NOT_FOUND, "Not found."),
    }
}

/// Serve the loopback port until the consent redirect arrives, then shut down.
///
/// Connections are handled concurrently, so a browser's idle preconnect
/// cannot hold up the redirect.
async fn wait_for_code(
    listener: TcpListener,
    expected_state: &str,
    debug: bool,
) -> Result<String, AuthError> {
    let (outcome_tx, outcome_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = Router::new()
        .route("/", get(receive_redirect))
        .with_state(RedirectListener {
            expected_state: Arc::new(expected_state.to_string()),
            debug,
            outcome: Arc::new(Mutex::new(Some(outcome_tx))),
        });

    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    let outcome = outcome_rx.await;
    let _ = shutdown_tx.send(());
    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(Ok(Err(e))) => tracing::debug!("Loopback server stopped with an error: {}", e),
        Err(_) => tracing::debug!("Loopback server still has open connections, leaving them"),
        _ => {}
    }

    outcome.map_err(|_| {
        AuthError::Consent("loopback server stopped before the redirect arrived".to_string())
    })?
}

// =============================================================================
// FLOW
// =============================================================================

/// Client secrets are only read when Google has to be asked for a token, so
/// a run with a fresh stored token works without the secrets file.
pub struct InstalledAppFlow {
    client: Client,
    secrets_path: PathBuf,
    secrets: OnceCell<ClientSecrets>,
    scope: String,
}

impl InstalledAppFlow {
    pub fn new(secrets_path: impl AsRef<Path>) -> Self {
        Self {
            client: Client::new(),
            secrets_path: secrets_path.as_ref().to_path_buf(),
            secrets: OnceCell::new(),
            scope: DRIVE_SCOPE.to_string(),
        }
    }

    #[cfg(test)]
    fn with_secrets(secrets: ClientSecrets) -> Self {
        Self {
            secrets: OnceCell::new_with(Some(secrets)),
            ..Self::new("client_secrets.json")
        }
    }

    async fn secrets(&self) -> Result<&ClientSecrets, AuthError> {
        self.secrets
            .get_or_try_init(|| ClientSecrets::load(&self.secrets_path))
            .await
    }

    fn consent_url(
        &self,
        secrets: &ClientSecrets,
        redirect_uri: &str,
        pkce: &Pkce,
        state: &str,
    ) -> Result<Url, AuthError> {
        Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("access_type", "offline"),
                ("code_challenge", pkce.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", state),
            ],
        )
        .map_err(|e| AuthError::Consent(format!("invalid auth_uri {}: {}", secrets.auth_uri, e)))
    }

    /// POST a form to the token endpoint, returning the status and raw body.
    async fn token_request(
        &self,
        secrets: &ClientSecrets,
        form: &[(&str, &str)],
    ) -> Result<(u16, String), AuthError> {
        let response = self
            .client
            .post(&secrets.token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::TokenExchange {
                status: 0,
                body: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Ok((status, body))
    }

    async fn exchange_code(
        &self,
        secrets: &ClientSecrets,
        code: &str,
        redirect_uri: &str,
        pkce: &Pkce,
    ) -> Result<TokenGrant, AuthError> {
        let (status, body) = self
            .token_request(
                secrets,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code),
                    ("redirect_uri", redirect_uri),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                    ("code_verifier", pkce.verifier.as_str()),
                ],
            )
            .await?;

        if !(200..300).contains(&status) {
            return Err(AuthError::TokenExchange { status, body });
        }
        serde_json::from_str(&body).map_err(|e| AuthError::TokenExchange {
            status,
            body: format!("{} ({})", body, e),
        })
    }
}

#[async_trait]
impl AuthorizationFlow for InstalledAppFlow {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let secrets = self.secrets().await?;
        let (status, body) = self
            .token_request(
                secrets,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                ],
            )
            .await?;

        if !(200..300).contains(&status) {
            return Err(AuthError::Refresh { status, body });
        }
        serde_json::from_str(&body).map_err(|e| AuthError::Refresh {
            status,
            body: format!("{} ({})", body, e),
        })
    }

    async fn authorize(&self, options: &ConsentOptions) -> Result<TokenGrant, AuthError> {
        let secrets = self.secrets().await?;

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .map_err(|e| AuthError::Consent(format!("cannot open loopback port: {}", e)))?;
        let port = listener
            .local_addr()
            .map_err(|e| AuthError::Consent(e.to_string()))?
            .port();
        let redirect_uri = format!("http://127.0.0.1:{}", port);

        let pkce = Pkce::generate();
        let state = random_token(32);
        let url = self.consent_url(secrets, &redirect_uri, &pkce, &state)?;

        if options.debug {
            tracing::info!(%redirect_uri, "Consent URL: {}", url);
        }
        match open::that(url.as_str()) {
            Ok(()) => tracing::info!("Opened the browser for Drive authorization"),
            Err(e) => tracing::warn!(
                "Could not open a browser ({}). Open this URL to authorize: {}",
                e,
                url
            ),
        }

        let code = wait_for_code(listener, &state, options.debug).await?;
        let grant = self.exchange_code(secrets, &code, &redirect_uri, &pkce).await?;
        tracing::info!("Authorization complete");
        Ok(grant)
    }
}
