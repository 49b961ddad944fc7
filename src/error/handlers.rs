//! Error handlers
//!
//! Converts non-fatal command faults into the reply sent to the client.

use crate::error::types::CommandError;
use crate::protocol::Reply;
use log::warn;
use std::net::SocketAddr;

/// Logs a command fault and turns it into a `550 <message>` reply.
pub fn fault_reply(peer: SocketAddr, err: &CommandError) -> Reply {
    warn!("FAULT for {}: {}", peer, err);
    Reply::fault(err.to_string())
}
