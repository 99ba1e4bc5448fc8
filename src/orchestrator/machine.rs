//! Single-flight operation state machine.
//!
//! `Idle -> Validating -> Running -> {Succeeded, Failed} -> Idle`. Only this type
//! mutates the current state, progress and status; presentation layers read
//! snapshots or consume [`OrchestratorEvent`]s.

use super::progress::{self, PROGRESS_DONE};
use crate::engine::{self, Engine, EngineOutput, Invocation};
use crate::error::SubmitError;
use crate::model::{
    FailureKind, OperationKind, OperationRequest, OrchestratorEvent, OrchestratorState, Outcome,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::watch;

pub const STATUS_PREPARING: &str = "Preparing…";
pub const STATUS_EXECUTING: &str = "Executing…";

pub struct Orchestrator {
    engine: Arc<dyn Engine>,
    progress_duration: Duration,
    channels: Arc<Channels>,
}

/// Current state, progress and status, plus the optional event sink. Shared with
/// the engine task so an abandoned run can still release the flight.
struct Channels {
    state: watch::Sender<OrchestratorState>,
    progress: watch::Sender<u8>,
    status: watch::Sender<String>,
    event_tx: Option<UnboundedSender<OrchestratorEvent>>,
}

/// Returns the orchestrator to `Idle` once every holder is gone. `submit` holds
/// one reference and the engine task another, so a dropped `submit` stays busy
/// until the engine process it started has exited.
struct FlightGuard {
    channels: Arc<Channels>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.channels.transition(OrchestratorState::Idle);
    }
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn Engine>, progress_duration: Duration) -> Self {
        Self {
            engine,
            progress_duration,
            channels: Arc::new(Channels {
                state: watch::Sender::new(OrchestratorState::Idle),
                progress: watch::Sender::new(0),
                status: watch::Sender::new(String::new()),
                event_tx: None,
            }),
        }
    }

    /// Push every state, progress and status change onto `tx`.
    pub fn with_events(self, tx: UnboundedSender<OrchestratorEvent>) -> Self {
        let channels = Channels {
            state: watch::Sender::new(self.state()),
            progress: watch::Sender::new(self.progress()),
            status: watch::Sender::new(self.status()),
            event_tx: Some(tx),
        };
        Self {
            channels: Arc::new(channels),
            ..self
        }
    }

    pub fn state(&self) -> OrchestratorState {
        *self.channels.state.borrow()
    }

    pub fn progress(&self) -> u8 {
        *self.channels.progress.borrow()
    }

    pub fn status(&self) -> String {
        self.channels.status.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<OrchestratorState> {
        self.channels.state.subscribe()
    }

    pub fn watch_progress(&self) -> watch::Receiver<u8> {
        self.channels.progress.subscribe()
    }

    /// Run one operation to its terminal outcome.
    ///
    /// Returns `Err(SubmitError::Busy)` without side effects on the in-flight
    /// operation when called while another one is running. Every other path,
    /// including validation and launch failures, yields `Ok(outcome)`.
    pub async fn submit(&self, request: OperationRequest) -> Result<Outcome, SubmitError> {
        let channels = &self.channels;
        let claimed = channels.state.send_if_modified(|s| {
            if *s == OrchestratorState::Idle {
                *s = OrchestratorState::Validating;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::info!(kind = %request.kind(), "submit rejected: operation already in flight");
            channels.emit(OrchestratorEvent::Rejected);
            return Err(SubmitError::Busy);
        }
        let flight = Arc::new(FlightGuard {
            channels: Arc::clone(channels),
        });
        channels.emit(OrchestratorEvent::StateChanged(OrchestratorState::Validating));

        tracing::info!(?request, "operation submitted");
        channels.set_progress(0);
        channels.set_status(STATUS_PREPARING.to_string());

        let kind = request.kind();
        let outcome = match engine::validate(&request) {
            Ok(invocation) => {
                self.run(invocation, request.output_path(), Arc::clone(&flight))
                    .await
            }
            Err(e) => {
                tracing::info!(error = %e, "request failed validation");
                Outcome::from(e)
            }
        };

        channels.report(kind, &outcome);
        drop(flight);
        Ok(outcome)
    }

    async fn run(
        &self,
        invocation: Invocation,
        output_path: &Path,
        flight: Arc<FlightGuard>,
    ) -> Outcome {
        let channels = &self.channels;
        channels.transition(OrchestratorState::Running);
        channels.set_status(STATUS_EXECUTING.to_string());

        let kind = invocation.kind;
        let engine = Arc::clone(&self.engine);
        let mut task = tokio::spawn(async move {
            let res = engine.execute(&invocation).await;
            // Released before the result is observable, so a completed run never
            // leaves the flight held after `submit` reports.
            drop(flight);
            res
        });
        let (ticker, mut ticks) = progress::spawn_ticker(self.progress_duration);

        // Engine completion wins any tie with a pending tick, so no tick can land
        // after the result is known.
        let joined = loop {
            tokio::select! {
                biased;
                res = &mut task => break res,
                Some(v) = ticks.recv() => channels.set_progress(v),
            }
        };
        drop(ticker);

        match joined {
            Ok(Ok(out)) if out.success() => {
                channels.set_progress(PROGRESS_DONE);
                Outcome::Success {
                    output_path: output_path.to_path_buf(),
                }
            }
            Ok(Ok(out)) => engine_failure(kind, out),
            Ok(Err(launch)) => {
                tracing::info!(error = %launch, "engine could not be launched");
                Outcome::from(launch)
            }
            Err(e) => {
                tracing::error!(error = %e, "engine task failed");
                Outcome::Failure {
                    kind: FailureKind::Engine,
                    reason: format!("{} task failed: {e}", kind.noun()),
                }
            }
        }
    }
}

impl Channels {
    /// Move to the terminal state and publish the outcome. Dropping the last
    /// flight reference returns to `Idle` right after.
    fn report(&self, kind: OperationKind, outcome: &Outcome) {
        match outcome {
            Outcome::Success { output_path } => {
                tracing::info!(%kind, output = %output_path.display(), "operation succeeded");
                self.transition(OrchestratorState::Succeeded);
                self.set_status(format!("{} completed successfully", kind.noun()));
            }
            Outcome::Failure { kind: why, reason } => {
                tracing::info!(%kind, failure = ?why, %reason, "operation failed");
                self.transition(OrchestratorState::Failed);
                self.set_status(format!("{} failed", kind.noun()));
            }
        }
        self.emit(OrchestratorEvent::Completed {
            kind,
            outcome: outcome.clone(),
        });
    }

    fn transition(&self, next: OrchestratorState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            tracing::debug!(from = ?prev, to = ?next, "state transition");
            self.emit(OrchestratorEvent::StateChanged(next));
        }
    }

    fn set_progress(&self, value: u8) {
        self.progress.send_replace(value);
        self.emit(OrchestratorEvent::Progress(value));
    }

    fn set_status(&self, status: String) {
        self.status.send_replace(status.clone());
        self.emit(OrchestratorEvent::Status(status));
    }

    fn emit(&self, ev: OrchestratorEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(ev);
        }
    }
}

fn engine_failure(kind: OperationKind, out: EngineOutput) -> Outcome {
    let diagnostic = out.stderr.trim_end();
    let reason = if !diagnostic.trim().is_empty() {
        diagnostic.to_string()
    } else {
        match out.code {
            Some(code) => format!("{} failed with exit code {code}", kind.noun()),
            None => format!("{} was terminated before it finished", kind.noun()),
        }
    };
    tracing::debug!(code = ?out.code, "engine reported failure");
    Outcome::Failure {
        kind: FailureKind::Engine,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;
    use futures::future::BoxFuture;
    use std::ffi::OsString;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::{mpsc, Notify};

    /// Records every invocation and answers with a scripted result.
    struct ScriptedEngine {
        calls: Mutex<Vec<Vec<OsString>>>,
        code: Option<i32>,
        stderr: String,
        gate: Option<Arc<Notify>>,
        panics: bool,
        live: AtomicUsize,
        max_live: AtomicUsize,
    }

    impl ScriptedEngine {
        fn build(code: i32, stderr: &str, gate: Option<Arc<Notify>>, panics: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                code: Some(code),
                stderr: stderr.to_string(),
                gate,
                panics,
                live: AtomicUsize::new(0),
                max_live: AtomicUsize::new(0),
            })
        }

        fn exiting(code: i32, stderr: &str) -> Arc<Self> {
            Self::build(code, stderr, None, false)
        }

        fn gated(gate: Arc<Notify>) -> Arc<Self> {
            Self::build(0, "", Some(gate), false)
        }

        fn panicking() -> Arc<Self> {
            Self::build(0, "", None, true)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn max_concurrent(&self) -> usize {
            self.max_live.load(Ordering::SeqCst)
        }
    }

    impl Engine for ScriptedEngine {
        fn execute<'a>(
            &'a self,
            invocation: &'a Invocation,
        ) -> BoxFuture<'a, Result<EngineOutput, LaunchError>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(invocation.args.clone());
                let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_live.fetch_max(now, Ordering::SeqCst);
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                self.live.fetch_sub(1, Ordering::SeqCst);
                if self.panics {
                    panic!("engine blew up");
                }
                Ok(EngineOutput {
                    code: self.code,
                    stderr: self.stderr.clone(),
                })
            })
        }
    }

    fn input_file() -> tempfile::NamedTempFile {
        let f = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(f.path(), b"payload").unwrap();
        f
    }

    fn orchestrator(engine: Arc<ScriptedEngine>) -> Orchestrator {
        Orchestrator::new(engine, Duration::from_millis(50))
    }

    #[tokio::test]
    async fn missing_password_never_reaches_the_engine() {
        let engine = ScriptedEngine::exiting(0, "");
        let orch = orchestrator(engine.clone());
        let input = input_file();

        for kind in [OperationKind::Encrypt, OperationKind::Decrypt] {
            for pw in [None, Some(String::new())] {
                let out = orch
                    .submit(OperationRequest::new(input.path(), "out", kind, pw))
                    .await
                    .unwrap();
                assert_eq!(out.failure_kind(), Some(FailureKind::Validation));
            }
        }
        assert_eq!(engine.call_count(), 0);
        assert_eq!(orch.state(), OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn success_forces_progress_to_done() {
        let engine = ScriptedEngine::exiting(0, "");
        let orch = Orchestrator::new(engine.clone(), Duration::from_secs(3600));
        let input = input_file();

        let out = orch
            .submit(OperationRequest::new(
                input.path(),
                "out.huf",
                OperationKind::Compress,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(
            out,
            Outcome::Success {
                output_path: "out.huf".into()
            }
        );
        assert_eq!(orch.progress(), PROGRESS_DONE);
        assert_eq!(orch.status(), "Compression completed successfully");
        assert_eq!(engine.call_count(), 1);
    }

    #[tokio::test]
    async fn engine_stderr_becomes_the_reason() {
        let engine = ScriptedEngine::exiting(1, "bad key\n");
        let orch = orchestrator(engine);
        let input = input_file();

        let out = orch
            .submit(OperationRequest::new(
                input.path(),
                "out",
                OperationKind::Decrypt,
                Some("pw".into()),
            ))
            .await
            .unwrap();
        assert_eq!(
            out,
            Outcome::Failure {
                kind: FailureKind::Engine,
                reason: "bad key".into()
            }
        );
        assert_eq!(orch.status(), "Decryption failed");
        assert!(orch.progress() < PROGRESS_DONE);
    }

    #[tokio::test]
    async fn empty_stderr_falls_back_to_exit_code() {
        let engine = ScriptedEngine::exiting(3, "  \n");
        let orch = orchestrator(engine);
        let input = input_file();

        let out = orch
            .submit(OperationRequest::new(
                input.path(),
                "out",
                OperationKind::Decompress,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(
            out.reason(),
            Some("Decompression failed with exit code 3")
        );
    }

    #[tokio::test]
    async fn second_submit_while_running_is_rejected() {
        let gate = Arc::new(Notify::new());
        let engine = ScriptedEngine::gated(gate.clone());
        let orch = Arc::new(orchestrator(engine.clone()));
        let input = input_file();
        let path = input.path().to_path_buf();

        let first = {
            let orch = Arc::clone(&orch);
            let path = path.clone();
            tokio::spawn(async move {
                orch.submit(OperationRequest::new(
                    path,
                    "first.out",
                    OperationKind::Compress,
                    None,
                ))
                .await
            })
        };

        let mut state = orch.watch_state();
        state
            .wait_for(|s| *s == OrchestratorState::Running)
            .await
            .unwrap();

        let second = orch
            .submit(OperationRequest::new(
                path,
                "second.out",
                OperationKind::Compress,
                None,
            ))
            .await;
        assert_eq!(second, Err(SubmitError::Busy));
        assert_eq!(orch.state(), OrchestratorState::Running);

        gate.notify_one();
        let out = first.await.unwrap().unwrap();
        assert_eq!(
            out,
            Outcome::Success {
                output_path: "first.out".into()
            }
        );
        assert_eq!(engine.call_count(), 1);
        assert_eq!(orch.state(), OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn events_follow_the_state_machine() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orch = Orchestrator::new(ScriptedEngine::exiting(0, ""), Duration::from_millis(10))
            .with_events(tx);
        let input = input_file();

        orch.submit(OperationRequest::new(
            input.path(),
            "out",
            OperationKind::Encrypt,
            Some("pw".into()),
        ))
        .await
        .unwrap();
        drop(orch);

        let mut states = Vec::new();
        let mut statuses = Vec::new();
        let mut completed = 0;
        let mut progress = Vec::new();
        while let Some(ev) = rx.recv().await {
            match ev {
                OrchestratorEvent::StateChanged(s) => states.push(s),
                OrchestratorEvent::Status(s) => statuses.push(s),
                OrchestratorEvent::Completed { kind, .. } => {
                    assert_eq!(kind, OperationKind::Encrypt);
                    completed += 1
                }
                OrchestratorEvent::Progress(p) => progress.push(p),
                OrchestratorEvent::Rejected => panic!("unexpected rejection"),
            }
        }

        assert_eq!(
            states,
            vec![
                OrchestratorState::Validating,
                OrchestratorState::Running,
                OrchestratorState::Succeeded,
                OrchestratorState::Idle,
            ]
        );
        assert_eq!(
            statuses,
            vec![
                STATUS_PREPARING.to_string(),
                STATUS_EXECUTING.to_string(),
                "Encryption completed successfully".to_string(),
            ]
        );
        assert_eq!(completed, 1);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last().copied(), Some(PROGRESS_DONE));
    }

    #[tokio::test]
    async fn validation_failure_skips_running() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orch = Orchestrator::new(ScriptedEngine::exiting(0, ""), Duration::from_millis(10))
            .with_events(tx);

        let out = orch
            .submit(OperationRequest::new("", "out", OperationKind::Compress, None))
            .await
            .unwrap();
        assert_eq!(out.reason(), Some("You must select an input file."));
        drop(orch);

        let mut states = Vec::new();
        while let Some(ev) = rx.recv().await {
            if let OrchestratorEvent::StateChanged(s) = ev {
                states.push(s);
            }
        }
        assert_eq!(
            states,
            vec![
                OrchestratorState::Validating,
                OrchestratorState::Failed,
                OrchestratorState::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn dropped_submit_stays_busy_until_the_engine_exits() {
        let gate = Arc::new(Notify::new());
        let engine = ScriptedEngine::gated(gate.clone());
        let orch = orchestrator(engine.clone());
        let input = input_file();
        let request =
            || OperationRequest::new(input.path(), "out", OperationKind::Compress, None);

        let mut state = orch.watch_state();
        let mut pending = Box::pin(orch.submit(request()));
        tokio::select! {
            _ = &mut pending => panic!("gated engine finished early"),
            _ = state.wait_for(|s| *s == OrchestratorState::Running) => {}
        }
        drop(pending);

        // The engine task outlives the dropped submit and still owns the flight.
        assert_eq!(orch.state(), OrchestratorState::Running);
        assert_eq!(orch.submit(request()).await, Err(SubmitError::Busy));

        gate.notify_one();
        state
            .wait_for(|s| *s == OrchestratorState::Idle)
            .await
            .unwrap();

        gate.notify_one();
        let out = orch.submit(request()).await.unwrap();
        assert!(out.is_success());
        assert_eq!(engine.call_count(), 2);
        assert_eq!(engine.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn panicking_engine_fails_and_stops_the_ticker() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let orch = Orchestrator::new(ScriptedEngine::panicking(), Duration::from_millis(10))
            .with_events(tx);
        let input = input_file();

        let out = orch
            .submit(OperationRequest::new(
                input.path(),
                "out",
                OperationKind::Compress,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(out.failure_kind(), Some(FailureKind::Engine));
        assert!(out.reason().unwrap().starts_with("Compression task failed"));
        assert_eq!(orch.state(), OrchestratorState::Idle);

        // Give a leaked ticker time to fire before the stream is closed.
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(orch);

        let mut seen_completed = false;
        while let Some(ev) = rx.recv().await {
            match ev {
                OrchestratorEvent::Completed { .. } => seen_completed = true,
                OrchestratorEvent::Progress(p) => {
                    assert!(!seen_completed, "progress {p} after completion")
                }
                _ => {}
            }
        }
        assert!(seen_completed);
    }
}
