//! Authentication
//!
//! The session only knows the `AuthGateway` seam; `CredentialStore` is the
//! configuration-backed implementation the daemon ships with.

pub mod credentials;
pub mod validator;

pub use credentials::CredentialStore;
pub use validator::{AuthGateway, Identity, credential_digest};
