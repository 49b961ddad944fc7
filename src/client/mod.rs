//! Client sessions
//!
//! One session per control connection: its state, the control channel it
//! talks over, and the command loop that drives it.

pub mod control;
pub mod handler;
pub mod state;

pub use control::{ControlChannel, Inbound};
pub use handler::run_session;
pub use state::{AuthState, Session, SessionContext};
