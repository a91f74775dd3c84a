pub mod session_models;
pub mod session_service;

pub use session_models::{ConsentOptions, Session, StoredCredentials, TokenGrant, DRIVE_SCOPE};
pub use session_service::{
    AuthError, AuthorizationFlow, CredentialStore, SessionProvider, StoredSessionProvider,
};
