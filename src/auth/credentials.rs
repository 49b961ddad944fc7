//! Credential storage
//!
//! In-memory user table loaded from the `users` configuration section.

use std::collections::HashMap;

use crate::auth::{AuthGateway, Identity};
use crate::config::UserEntry;
use crate::error::AuthError;

struct StoredCredential {
    password_md5: String,
    identity: Identity,
}

/// User table keyed by username
pub struct CredentialStore {
    users: HashMap<String, StoredCredential>,
}

impl CredentialStore {
    pub fn from_entries(entries: &[UserEntry]) -> Self {
        let users = entries
            .iter()
            .map(|entry| {
                (
                    entry.username.clone(),
                    StoredCredential {
                        password_md5: entry.password_md5.to_ascii_lowercase(),
                        identity: Identity::new(entry.identity.clone()),
                    },
                )
            })
            .collect();

        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl AuthGateway for CredentialStore {
    fn verify(&self, username: &str, digest: &str) -> Result<Identity, AuthError> {
        match self.users.get(username) {
            Some(stored) if stored.password_md5 == digest => Ok(stored.identity.clone()),
            Some(_) => Err(AuthError::InvalidCredentials(username.to_string())),
            None => Err(AuthError::UnknownUser(username.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credential_digest;

    fn store() -> CredentialStore {
        CredentialStore::from_entries(&[UserEntry {
            username: "alice".into(),
            password_md5: credential_digest("wonderland").to_uppercase(),
            identity: "42".into(),
        }])
    }

    #[test]
    fn matching_digest_yields_identity() {
        let identity = store()
            .verify("alice", &credential_digest("wonderland"))
            .unwrap();
        assert_eq!(identity, Identity::new("42"));
    }

    #[test]
    fn wrong_digest_is_rejected() {
        let result = store().verify("alice", &credential_digest("looking-glass"));
        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[test]
    fn unknown_user_is_rejected() {
        let result = store().verify("bob", &credential_digest("wonderland"));
        assert!(matches!(result, Err(AuthError::UnknownUser(_))));
    }
}
