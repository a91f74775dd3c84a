// Auth infra layer.
// - `installed_app.rs` runs Google's OAuth installed-app flow.
// - `service_account.rs` signs JWT assertions for headless machines.
// - `file_credential_store.rs` persists tokens between runs.

pub mod client_secrets;
pub mod file_credential_store;
pub mod installed_app;
pub mod service_account;

pub use file_credential_store::FileCredentialStore;
pub use installed_app::InstalledAppFlow;
pub use service_account::ServiceAccountAuth;
