// The infra module contains implementations of core traits.
// Each concern's implementation goes in its own submodule.

#[path = "auth/mod.rs"]
pub mod auth;

#[path = "discovery/mod.rs"]
pub mod discovery;

#[path = "drive/mod.rs"]
pub mod drive;
