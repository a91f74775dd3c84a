use async_trait::async_trait;
use reqwest::Client;

use crate::core::discovery::{ApiDescription, DiscoveryError, DiscoveryFetcher};

pub const GOOGLE_DISCOVERY_ROOT: &str = "https://www.googleapis.com";

/// Fetches discovery documents from Google's public discovery service.
pub struct HttpDiscoveryFetcher {
    client: Client,
    base_url: String,
}

impl HttpDiscoveryFetcher {
    pub fn new() -> Self {
        Self::with_base_url(GOOGLE_DISCOVERY_ROOT)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for HttpDiscoveryFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DiscoveryFetcher for HttpDiscoveryFetcher {
    async fn fetch(&self, api: &str, version: &str) -> Result<ApiDescription, DiscoveryError> {
        let url = format!(
            "{}/discovery/v1/apis/{}/{}/rest",
            self.base_url.trim_end_matches('/'),
            api,
            version
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DiscoveryError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Fetch(format!("{} returned {}: {}", url, status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| DiscoveryError::Fetch(format!("{} is not a usable description: {}", url, e)))
    }
}
