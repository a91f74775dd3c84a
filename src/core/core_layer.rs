// The core module contains the publishing logic and the traits it depends on.
// Each concern gets its own submodule.

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "discovery/mod.rs"]
pub mod discovery;

#[path = "publish/mod.rs"]
pub mod publish;
