//! FTP control protocol
//!
//! Command parsing, reply values and the per-verb handlers.

pub mod commands;
pub mod handlers;
pub mod parser;
pub mod responses;

pub use commands::{Command, CommandResult, CommandStatus, Verb};
pub use handlers::dispatch;
pub use parser::{decode_line, parse_command};
pub use responses::Reply;
