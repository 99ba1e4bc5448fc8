use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The four operations the front-end can delegate to an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Encrypt,
    Decrypt,
    Compress,
    Decompress,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Encrypt,
        OperationKind::Decrypt,
        OperationKind::Compress,
        OperationKind::Decompress,
    ];

    /// Verb passed as the first positional argument to the engine.
    pub fn as_verb(self) -> &'static str {
        match self {
            OperationKind::Encrypt => "encrypt",
            OperationKind::Decrypt => "decrypt",
            OperationKind::Compress => "compress",
            OperationKind::Decompress => "decompress",
        }
    }

    /// Noun used in status lines ("Encryption completed successfully").
    pub fn noun(self) -> &'static str {
        match self {
            OperationKind::Encrypt => "Encryption",
            OperationKind::Decrypt => "Decryption",
            OperationKind::Compress => "Compression",
            OperationKind::Decompress => "Decompression",
        }
    }

    pub fn requires_password(self) -> bool {
        matches!(self, OperationKind::Encrypt | OperationKind::Decrypt)
    }

    /// Next kind in display order, wrapping around. Used by the TUI selector.
    pub fn next(self) -> Self {
        match self {
            OperationKind::Encrypt => OperationKind::Decrypt,
            OperationKind::Decrypt => OperationKind::Compress,
            OperationKind::Compress => OperationKind::Decompress,
            OperationKind::Decompress => OperationKind::Encrypt,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            OperationKind::Encrypt => OperationKind::Decompress,
            OperationKind::Decrypt => OperationKind::Encrypt,
            OperationKind::Compress => OperationKind::Decrypt,
            OperationKind::Decompress => OperationKind::Compress,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_verb())
    }
}

/// A user's request to run one operation. Built fresh for every submission and
/// never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct OperationRequest {
    input_path: PathBuf,
    output_path: PathBuf,
    kind: OperationKind,
    password: Option<String>,
}

impl OperationRequest {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        kind: OperationKind,
        password: Option<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            kind,
            password,
        }
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

// Hand-written so the password never ends up in logs.
impl fmt::Debug for OperationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationRequest")
            .field("input_path", &self.input_path)
            .field("output_path", &self.output_path)
            .field("kind", &self.kind)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Which class of failure ended an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The request was rejected before any process was started.
    Validation,
    /// The engine executable could not be started.
    Launch,
    /// The engine ran and exited non-zero.
    Engine,
}

/// Terminal result of one submitted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success { output_path: PathBuf },
    Failure { kind: FailureKind, reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { reason, .. } => Some(reason),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { kind, .. } => Some(*kind),
        }
    }

    /// Render a message for presentation layers. Validation failures read as
    /// instructions, everything else as an operation failure.
    pub fn to_message(&self, kind: OperationKind) -> String {
        match self {
            Outcome::Success { output_path } => format!(
                "{} completed successfully: {}",
                kind.noun(),
                output_path.display()
            ),
            Outcome::Failure {
                kind: FailureKind::Validation | FailureKind::Launch,
                reason,
            } => reason.clone(),
            Outcome::Failure {
                kind: FailureKind::Engine,
                reason,
            } => format!("The operation failed: {reason}"),
        }
    }
}

/// Lifecycle of the orchestrator. `Succeeded` and `Failed` are transient and
/// fall back to `Idle` as soon as the outcome has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorState {
    Idle,
    Validating,
    Running,
    Succeeded,
    Failed,
}

impl OrchestratorState {
    pub fn is_busy(self) -> bool {
        !matches!(self, OrchestratorState::Idle)
    }
}

/// Events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorEvent {
    StateChanged(OrchestratorState),
    Progress(u8),
    Status(String),
    /// Terminal outcome, tagged with the kind of the request that was accepted.
    Completed { kind: OperationKind, outcome: Outcome },
    /// A submission arrived while another operation was in flight and was dropped.
    Rejected,
}

/// Report printed in JSON mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub timestamp_utc: String,
    pub kind: OperationKind,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub elapsed_ms: u64,
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_required_only_for_crypto_kinds() {
        assert!(OperationKind::Encrypt.requires_password());
        assert!(OperationKind::Decrypt.requires_password());
        assert!(!OperationKind::Compress.requires_password());
        assert!(!OperationKind::Decompress.requires_password());
    }

    #[test]
    fn next_and_prev_cycle_through_every_kind() {
        let mut k = OperationKind::Encrypt;
        for expected in OperationKind::ALL.iter().skip(1) {
            k = k.next();
            assert_eq!(k, *expected);
        }
        assert_eq!(k.next(), OperationKind::Encrypt);
        assert_eq!(OperationKind::Encrypt.prev(), OperationKind::Decompress);
    }

    #[test]
    fn debug_output_redacts_password() {
        let req = OperationRequest::new(
            "in.txt",
            "out.bin",
            OperationKind::Encrypt,
            Some("hunter2".into()),
        );
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let out = Outcome::Failure {
            kind: FailureKind::Engine,
            reason: "bad key".into(),
        };
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["status"], "failure");
        assert_eq!(v["kind"], "engine");
        assert_eq!(v["reason"], "bad key");
    }

    #[test]
    fn engine_failures_are_worded_as_operation_failures() {
        let out = Outcome::Failure {
            kind: FailureKind::Engine,
            reason: "bad key".into(),
        };
        assert_eq!(
            out.to_message(OperationKind::Decrypt),
            "The operation failed: bad key"
        );
    }
}
