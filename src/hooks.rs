//! Post-upload processing
//!
//! After a file lands, the session notifies a `PostProcessHook`. Hooks are
//! fire-and-forget: nothing they do changes the reply sent to the client.

use log::{info, warn};
use std::io;
use std::process::Stdio;
use tokio::process::{Child, Command};

use crate::auth::Identity;

pub trait PostProcessHook: Send + Sync {
    fn notify(&self, identity: &Identity, stored_filename: &str);
}

/// Hook that does nothing.
pub struct NoopHook;

impl PostProcessHook for NoopHook {
    fn notify(&self, _identity: &Identity, _stored_filename: &str) {}
}

/// Runs `<program> <args...> <identity> <filename>` for every completed upload.
///
/// Arguments are passed directly to the program, never through a shell.
pub struct CommandHook {
    program: String,
    args: Vec<String>,
}

impl CommandHook {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Leading arguments placed before the identity and filename.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn launch(&self, identity: &Identity, stored_filename: &str) -> io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(identity.as_str())
            .arg(stored_filename)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .spawn()
    }
}

impl PostProcessHook for CommandHook {
    fn notify(&self, identity: &Identity, stored_filename: &str) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime available to run post-process hook {}", self.program);
            return;
        };

        let mut child = match self.launch(identity, stored_filename) {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start post-process hook {}: {}", self.program, e);
                return;
            }
        };

        let program = self.program.clone();
        let file = stored_filename.to_string();
        runtime.spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => info!("Post-process hook finished for {}", file),
                Ok(status) => warn!("Post-process hook {} exited with {} for {}", program, status, file),
                Err(e) => warn!("Post-process hook {} failed for {}: {}", program, file, e),
            }
        });
    }
}
