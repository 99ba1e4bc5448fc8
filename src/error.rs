//! Error types shared by the engine, orchestrator and config layers.
//!
//! Every variant here ends an operation (or a config load) without crashing the
//! orchestrator. `anyhow` is only used above this layer, in the CLI plumbing.

use crate::model::{FailureKind, OperationKind, Outcome};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A request rejected before any process was spawned.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("You must select an input file.")]
    MissingInput,
    #[error("You must select an output file.")]
    MissingOutput,
    #[error("You must supply a password to {kind}.")]
    MissingPassword { kind: OperationKind },
    #[error("You must select an existing input file: {} does not exist.", .path.display())]
    InputNotFound { path: PathBuf },
    #[error("You must select a regular file as input: {} is not a file.", .path.display())]
    InputNotAFile { path: PathBuf },
    #[error("You must select a readable input file: {}: {source}", .path.display())]
    InputUnreadable { path: PathBuf, source: io::Error },
}

/// The engine executable could not be started at all.
#[derive(Debug, Error)]
#[error("Could not start {}: {source}", .program.display())]
pub struct LaunchError {
    pub program: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Returned by `submit` when another operation is already in flight.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("an operation is already running")]
    Busy,
}

/// Failures loading the optional JSON config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config file {}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl From<ValidationError> for Outcome {
    fn from(e: ValidationError) -> Self {
        Outcome::Failure {
            kind: FailureKind::Validation,
            reason: e.to_string(),
        }
    }
}

impl From<LaunchError> for Outcome {
    fn from(e: LaunchError) -> Self {
        Outcome::Failure {
            kind: FailureKind::Launch,
            reason: e.to_string(),
        }
    }
}
