//! Command loop between an interactive front-end and the orchestrator.
//!
//! The UI thread never awaits anything: it sends [`UiCommand`]s and renders the
//! [`OrchestratorEvent`]s that come back.

use super::machine::Orchestrator;
use crate::model::OperationRequest;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub enum UiCommand {
    Submit(OperationRequest),
    Quit,
}

/// Forward UI commands to the orchestrator until the UI quits.
///
/// Each submit runs on its own task so a second submit can reach the
/// orchestrator while the first is in flight; the orchestrator rejects it and
/// reports that back as an event. On quit, any in-flight operation is abandoned
/// and its engine process is left to finish on its own.
pub async fn run_controller(
    orch: Arc<Orchestrator>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut inflight: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Submit(request)) => {
                        let orch = Arc::clone(&orch);
                        inflight.spawn(async move {
                            // Busy is already surfaced as an event.
                            let _ = orch.submit(request).await;
                        });
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(joined) = inflight.join_next() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "submit task failed");
                }
            }
        }
    }

    // Detach rather than abort: the engine child keeps running to completion.
    inflight.detach_all();
    Ok(())
}
