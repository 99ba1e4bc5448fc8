use super::{Engine, EngineOutput, EngineRole, Invocation};
use crate::error::LaunchError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// How to launch one engine: the executable plus any leading arguments placed
/// before the contract arguments (e.g. an interpreter and a script path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "EngineCommandRepr")]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

/// Config files may give a bare path or the full `{ program, args }` object.
#[derive(Deserialize)]
#[serde(untagged)]
enum EngineCommandRepr {
    Path(PathBuf),
    Full {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl From<EngineCommandRepr> for EngineCommand {
    fn from(r: EngineCommandRepr) -> Self {
        match r {
            EngineCommandRepr::Path(program) => EngineCommand {
                program,
                args: Vec::new(),
            },
            EngineCommandRepr::Full { program, args } => EngineCommand { program, args },
        }
    }
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

/// Engine backed by real child processes.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    encryption: EngineCommand,
    compression: EngineCommand,
}

impl ProcessEngine {
    pub fn new(encryption: EngineCommand, compression: EngineCommand) -> Self {
        Self {
            encryption,
            compression,
        }
    }

    pub fn command_for(&self, role: EngineRole) -> &EngineCommand {
        match role {
            EngineRole::Encryption => &self.encryption,
            EngineRole::Compression => &self.compression,
        }
    }
}

impl Engine for ProcessEngine {
    fn execute<'a>(
        &'a self,
        invocation: &'a Invocation,
    ) -> BoxFuture<'a, Result<EngineOutput, LaunchError>> {
        Box::pin(async move {
            let cmd = self.command_for(invocation.role);
            tracing::debug!(
                program = %cmd.program.display(),
                args = ?invocation.redacted_args(),
                "spawning engine"
            );

            // No shell: every argument reaches the engine verbatim. The child is not
            // killed if this future is dropped; an abandoned run finishes on its own.
            let child = Command::new(&cmd.program)
                .args(&cmd.args)
                .args(&invocation.args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()
                .map_err(|source| LaunchError {
                    program: cmd.program.clone(),
                    source,
                })?;

            let output = match child.wait_with_output().await {
                Ok(o) => o,
                Err(e) => {
                    tracing::warn!(error = %e, "failed waiting for engine");
                    return Ok(EngineOutput {
                        code: None,
                        stderr: format!("failed to wait for engine: {e}"),
                    });
                }
            };

            let out = EngineOutput {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            tracing::debug!(code = ?out.code, stderr_len = out.stderr.len(), "engine exited");
            Ok(out)
        })
    }
}
