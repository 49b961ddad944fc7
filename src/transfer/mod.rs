//! Transfer module
//!
//! Data channel negotiation (PASV/PORT), opening the per-transfer data
//! socket, and moving bytes over it.

pub mod data_channel;
pub mod file_ops;
pub mod modes;
pub mod operations;

pub use data_channel::{close_data_channel, open_data_channel};
pub use file_ops::{receive_upload, send_listing};
pub use modes::DataMode;
pub use operations::{parse_port_argument, setup_active_mode, setup_passive_mode};
