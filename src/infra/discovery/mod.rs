pub mod discovery_client;
pub mod file_cache;

pub use discovery_client::HttpDiscoveryFetcher;
pub use file_cache::FileDiscoveryCache;
