//! External engine seam.
//!
//! The encryption and compression tools are opaque executables. Everything the
//! orchestrator knows about them is the positional command line in [`contract`]
//! and the `(exit code, stderr)` pair an [`Engine`] hands back.

mod contract;
mod process;

pub use contract::{validate, EngineRole, Invocation};
pub use process::{EngineCommand, ProcessEngine};

use crate::error::LaunchError;
use futures::future::BoxFuture;

/// What a finished engine process reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stderr: String,
}

impl EngineOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs one engine invocation to completion.
///
/// Implementations must not retry and must pass arguments through literally.
pub trait Engine: Send + Sync {
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
    ) -> BoxFuture<'a, Result<EngineOutput, LaunchError>>;
}
