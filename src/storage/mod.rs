//! Upload storage
//!
//! Naming of uploaded files under the configured upload root.

pub mod filesystem;

pub use filesystem::{UploadTarget, upload_target};
