// Drive infra layer.
// - `drive_client.rs` talks to the Drive v2 REST API.
// - `multipart.rs` builds the multipart/related upload bodies.
// - `in_memory.rs` is a fake drive for exercising the publish workflow.

pub mod drive_client;
#[cfg(test)]
pub mod in_memory;
pub mod multipart;

pub use drive_client::GoogleDriveClient;
#[cfg(test)]
pub use in_memory::InMemoryDrive;
