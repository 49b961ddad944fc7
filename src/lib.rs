//! Ingest FTP daemon
//!
//! A small upload-only FTP server: authenticated clients STOR files over an
//! active or passive data connection, each upload is stored under the
//! uploader's identity and handed to a post-processing hook.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod hooks;
pub mod protocol;
pub mod server;
pub mod shutdown;
pub mod storage;
pub mod transfer;

pub use config::ServerConfig;
pub use server::Server;
pub use shutdown::ShutdownCoordinator;
