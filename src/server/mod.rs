//! Server core functionality
//!
//! Binds the control listener and runs the acceptor worker.

pub mod core;

pub use core::Server;
