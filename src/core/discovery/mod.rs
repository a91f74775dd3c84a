pub mod discovery_models;
pub mod discovery_service;

pub use discovery_models::{ApiDescription, Endpoint};
pub use discovery_service::{DiscoveryCache, DiscoveryError, DiscoveryFetcher, DiscoveryLoader};
