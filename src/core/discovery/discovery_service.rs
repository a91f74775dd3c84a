use async_trait::async_trait;
use thiserror::Error;

use super::discovery_models::ApiDescription;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Discovery cache {path} is corrupt: {reason}")]
    CorruptCache { path: String, reason: String },
    #[error("Discovery cache error: {0}")]
    Cache(String),
    #[error("Fetching the API description failed: {0}")]
    Fetch(String),
    #[error("API description has no usable method {0}")]
    UnknownMethod(String),
}

/// Flat-file style storage for API descriptions, keyed by api name and version.
#[async_trait]
pub trait DiscoveryCache: Send + Sync {
    async fn read(&self, api: &str, version: &str) -> Result<Option<ApiDescription>, DiscoveryError>;
    async fn write(
        &self,
        api: &str,
        version: &str,
        description: &ApiDescription,
    ) -> Result<(), DiscoveryError>;
}

/// Source of fresh API descriptions.
#[async_trait]
pub trait DiscoveryFetcher: Send + Sync {
    async fn fetch(&self, api: &str, version: &str) -> Result<ApiDescription, DiscoveryError>;
}

/// Loads an API description, preferring whatever is cached.
///
/// A cached description is trusted as-is: no expiry, no checksum.
pub struct DiscoveryLoader<C: DiscoveryCache, F: DiscoveryFetcher> {
    api: String,
    cache: C,
    fetcher: F,
}

impl<C: DiscoveryCache, F: DiscoveryFetcher> DiscoveryLoader<C, F> {
    pub fn new(api: impl Into<String>, cache: C, fetcher: F) -> Self {
        Self {
            api: api.into(),
            cache,
            fetcher,
        }
    }

    pub async fn load_api_description(&self, version: &str) -> Result<ApiDescription, DiscoveryError> {
        if let Some(cached) = self.cache.read(&self.api, version).await? {
            tracing::debug!(api = %self.api, version, "Using cached API description");
            return Ok(cached);
        }

        tracing::info!(api = %self.api, version, "Fetching API description");
        let description = self.fetcher.fetch(&self.api, version).await?;
        self.cache.write(&self.api, version, &description).await?;
        Ok(description)
    }
}
