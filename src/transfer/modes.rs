//! FTP data channel modes

use std::net::SocketAddr;
use tokio::net::TcpListener;

/// How the next data connection is established.
#[derive(Debug, Default)]
pub enum DataMode {
    /// Neither PASV nor PORT issued yet
    #[default]
    None,
    /// Server dials the client at this address (PORT)
    Active(SocketAddr),
    /// Server accepts the client's connection on this listener (PASV)
    Passive(TcpListener),
}

impl DataMode {
    /// Drops the current mode, closing a passive listener if there is one.
    /// Calling it again is a no-op.
    pub fn reset(&mut self) {
        *self = DataMode::None;
    }

    pub fn is_passive(&self) -> bool {
        matches!(self, DataMode::Passive(_))
    }

    pub fn describe(&self) -> String {
        match self {
            DataMode::None => "none".to_string(),
            DataMode::Active(addr) => format!("active to {}", addr),
            DataMode::Passive(listener) => match listener.local_addr() {
                Ok(addr) => format!("passive on {}", addr),
                Err(_) => "passive".to_string(),
            },
        }
    }
}
