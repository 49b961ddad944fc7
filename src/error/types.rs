//! Error types
//!
//! Domain-specific error types. Faults that only affect a single command
//! (`AuthError`, `TransferError`, storage I/O) end up as a reply; a
//! `SessionError` ends the session.

use std::fmt;
use std::io;
use std::net::SocketAddr;

/// Authentication errors
#[derive(Debug)]
pub enum AuthError {
    UnknownUser(String),
    InvalidCredentials(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::UnknownUser(u) => write!(f, "Unknown user: {}", u),
            AuthError::InvalidCredentials(u) => write!(f, "Invalid credentials for user: {}", u),
        }
    }
}

impl std::error::Error for AuthError {}

/// Data channel and upload errors
#[derive(Debug)]
pub enum TransferError {
    /// Neither PASV nor PORT has been issued
    NoDataConnection,
    AcceptTimeout,
    ConnectTimeout(SocketAddr),
    ReadTimeout,
    WriteTimeout,
    ConnectFailed(SocketAddr, io::Error),
    InvalidPortArgument(String),
    PassiveUnavailable(String),
    PathRejected(String),
    FileTooLarge(u64),
    Io(io::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::NoDataConnection => write!(f, "Use PORT or PASV first"),
            TransferError::AcceptTimeout => write!(f, "Timeout waiting for data connection"),
            TransferError::ConnectTimeout(addr) => {
                write!(f, "Timeout connecting to data port {}", addr)
            }
            TransferError::ReadTimeout => write!(f, "Timeout reading from data connection"),
            TransferError::WriteTimeout => write!(f, "Timeout writing to data connection"),
            TransferError::ConnectFailed(addr, e) => {
                write!(f, "Cannot open data connection to {}: {}", addr, e)
            }
            TransferError::InvalidPortArgument(arg) => write!(f, "Invalid PORT argument: {}", arg),
            TransferError::PassiveUnavailable(msg) => write!(f, "Passive mode unavailable: {}", msg),
            TransferError::PathRejected(p) => write!(f, "Path not allowed: {}", p),
            TransferError::FileTooLarge(limit) => {
                write!(f, "File exceeds the {} byte upload limit", limit)
            }
            TransferError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for TransferError {}

impl From<io::Error> for TransferError {
    fn from(error: io::Error) -> Self {
        TransferError::Io(error)
    }
}

/// Errors that end a session
#[derive(Debug)]
pub enum SessionError {
    /// Control channel read or write failed
    Io(io::Error),
    /// Control channel idle beyond the inactivity timeout
    Timeout,
    /// Cancelled by the shutdown coordinator
    Shutdown,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Io(e) => write!(f, "Control connection error: {}", e),
            SessionError::Timeout => write!(f, "Control connection timed out"),
            SessionError::Shutdown => write!(f, "Server shutting down"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<io::Error> for SessionError {
    fn from(error: io::Error) -> Self {
        SessionError::Io(error)
    }
}

/// Outcome of a failed command handler
#[derive(Debug)]
pub enum CommandError {
    Transfer(TransferError),
    /// Escalates out of the dispatch loop
    Session(SessionError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Transfer(e) => write!(f, "{}", e),
            CommandError::Session(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<TransferError> for CommandError {
    fn from(error: TransferError) -> Self {
        CommandError::Transfer(error)
    }
}

impl From<SessionError> for CommandError {
    fn from(error: SessionError) -> Self {
        CommandError::Session(error)
    }
}

/// Server startup errors
#[derive(Debug)]
pub enum ServerError {
    Config(config::ConfigError),
    Bind(String, io::Error),
    UploadRoot(io::Error),
    /// Shutdown already started; no new workers are accepted
    ShuttingDown,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Config(e) => write!(f, "Configuration error: {}", e),
            ServerError::Bind(addr, e) => write!(f, "Failed to bind to {}: {}", addr, e),
            ServerError::UploadRoot(e) => write!(f, "Cannot create upload root: {}", e),
            ServerError::ShuttingDown => write!(f, "Server is shutting down"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<config::ConfigError> for ServerError {
    fn from(error: config::ConfigError) -> Self {
        ServerError::Config(error)
    }
}
