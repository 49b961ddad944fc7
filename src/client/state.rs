//! Module `state`
//!
//! Per-connection session state. A `Session` is owned by exactly one worker
//! and never shared, so none of it is locked.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthGateway, Identity};
use crate::config::ServerConfig;
use crate::hooks::PostProcessHook;
use crate::transfer::DataMode;

/// Server-wide collaborators shared read-only by all sessions.
pub struct SessionContext {
    pub config: ServerConfig,
    pub auth: Arc<dyn AuthGateway>,
    pub hook: Arc<dyn PostProcessHook>,
}

impl SessionContext {
    pub fn idle_timeout(&self) -> Duration {
        self.config.inactivity_timeout()
    }

    pub fn upload_root(&self) -> PathBuf {
        self.config.upload_root_path()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated(Identity),
}

pub struct Session {
    peer: SocketAddr,
    local: SocketAddr,
    auth: AuthState,
    /// Set by USER, consumed by PASS
    pending_user: Option<String>,
    data_mode: DataMode,
    context: Arc<SessionContext>,
}

impl Session {
    pub fn new(peer: SocketAddr, local: SocketAddr, context: Arc<SessionContext>) -> Self {
        Self {
            peer,
            local,
            auth: AuthState::Unauthenticated,
            pending_user: None,
            data_mode: DataMode::None,
            context,
        }
    }

    // --------------------
    // Authentication
    // --------------------

    /// USER: record the name and drop any earlier login.
    pub fn begin_login(&mut self, username: &str) {
        self.auth = AuthState::Unauthenticated;
        self.pending_user = Some(username.to_string());
    }

    pub fn take_pending_user(&mut self) -> Option<String> {
        self.pending_user.take()
    }

    pub fn login(&mut self, identity: Identity) {
        self.auth = AuthState::Authenticated(identity);
    }

    pub fn logout(&mut self) {
        self.auth = AuthState::Unauthenticated;
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.auth, AuthState::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match &self.auth {
            AuthState::Authenticated(identity) => Some(identity),
            AuthState::Unauthenticated => None,
        }
    }

    /// Who to blame in log lines.
    pub fn user_label(&self) -> String {
        match (&self.auth, &self.pending_user) {
            (AuthState::Authenticated(identity), _) => identity.to_string(),
            (AuthState::Unauthenticated, Some(user)) => user.clone(),
            (AuthState::Unauthenticated, None) => "unknown".to_string(),
        }
    }

    // --------------------
    // Connection
    // --------------------

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn local(&self) -> SocketAddr {
        self.local
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn data_mode(&self) -> &DataMode {
        &self.data_mode
    }

    pub fn data_mode_mut(&mut self) -> &mut DataMode {
        &mut self.data_mode
    }

    /// Releases the passive listener and the login. Safe to call repeatedly.
    pub fn release(&mut self) {
        self.data_mode.reset();
        self.pending_user = None;
        self.auth = AuthState::Unauthenticated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::CredentialStore;
    use crate::hooks::NoopHook;

    fn session() -> Session {
        let context = Arc::new(SessionContext {
            config: ServerConfig::default(),
            auth: Arc::new(CredentialStore::from_entries(&[])),
            hook: Arc::new(NoopHook),
        });
        let addr: SocketAddr = "127.0.0.1:21".parse().unwrap();
        Session::new(addr, addr, context)
    }

    #[test]
    fn user_demotes_an_authenticated_session() {
        let mut s = session();
        s.login(Identity::new("42"));
        assert!(s.is_authenticated());

        s.begin_login("mallory");
        assert_eq!(s.auth(), &AuthState::Unauthenticated);
        assert_eq!(s.take_pending_user().as_deref(), Some("mallory"));
        assert_eq!(s.take_pending_user(), None);
    }

    #[test]
    fn release_is_idempotent() {
        let mut s = session();
        s.login(Identity::new("42"));
        s.release();
        s.release();
        assert!(!s.is_authenticated());
        assert!(matches!(s.data_mode(), DataMode::None));
    }
}
