//! Error handling
//!
//! Defines error types and the conversion of command faults into replies.

pub mod handlers;
pub mod types;

pub use handlers::fault_reply;
pub use types::*;
