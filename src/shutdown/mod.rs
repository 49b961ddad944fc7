//! Worker supervision and shutdown
//!
//! Every live worker (the acceptor and one task per session) is registered
//! with the `ShutdownCoordinator`, which can cancel and force-close any of
//! them and drives the bounded graceful-then-forced shutdown.

pub mod coordinator;
pub mod registry;

pub use coordinator::{ShutdownCoordinator, Worker};
pub use registry::{CancelSignal, WorkerId, WorkerKind};
