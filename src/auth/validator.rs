//! Authentication gateway
//!
//! Verifies a username plus password digest and yields the identity the
//! session works under from then on.

use crate::error::AuthError;
use std::fmt;

/// Opaque authenticated-user handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External user store lookup.
pub trait AuthGateway: Send + Sync {
    fn verify(&self, username: &str, digest: &str) -> Result<Identity, AuthError>;
}

/// Lowercase hex MD5 of the password, the form the user store keeps.
pub fn credential_digest(password: &str) -> String {
    format!("{:x}", md5::compute(password.as_bytes()))
}
