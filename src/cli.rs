use crate::config::{self, AppConfig, Overrides};
use crate::engine::ProcessEngine;
use crate::model::{OperationKind, OperationRequest, OrchestratorEvent};
use crate::orchestrator::{build_report, Orchestrator, PROGRESS_DONE};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
///
/// The std handles are locked per line, never for the writer's lifetime: the
/// tracing layer writes to the same stderr from the orchestrator task.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        while let Some(line) = rx.blocking_recv() {
            let _ = match line {
                OutputLine::Stdout(msg) => writeln!(std::io::stdout(), "{msg}"),
                OutputLine::Stderr(msg) => writeln!(std::io::stderr(), "{msg}"),
            };
        }
        let _ = std::io::stdout().flush();
    });
    (tx, handle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OperationArg {
    Encrypt,
    Decrypt,
    Compress,
    Decompress,
}

impl From<OperationArg> for OperationKind {
    fn from(op: OperationArg) -> Self {
        match op {
            OperationArg::Encrypt => OperationKind::Encrypt,
            OperationArg::Decrypt => OperationKind::Decrypt,
            OperationArg::Compress => OperationKind::Compress,
            OperationArg::Decompress => OperationKind::Decompress,
        }
    }
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "secure-file-tool",
    version,
    about = "Encrypt, decrypt, compress or decompress a file through external engines"
)]
pub struct Cli {
    /// File to read
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// File to write (overwritten on success)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Operation to run
    #[arg(long, value_enum, default_value_t = OperationArg::Encrypt)]
    pub operation: OperationArg,

    /// Password for encrypt/decrypt (ignored for compress/decompress)
    #[arg(long, env = "SECURE_FILE_TOOL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Print JSON report and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print status lines and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Run silently: suppress all output except the failure message
    #[arg(long)]
    pub silent: bool,

    /// Path to a JSON config file (defaults to the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Encryption engine executable
    #[arg(long)]
    pub encrypt_tool: Option<PathBuf>,

    /// Compression engine executable
    #[arg(long)]
    pub compress_tool: Option<PathBuf>,

    /// Nominal duration of the progress animation
    #[arg(long)]
    pub progress_duration: Option<humantime::Duration>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// True when the TUI owns the terminal for this run.
    pub fn is_interactive(&self) -> bool {
        cfg!(feature = "tui") && !self.json && !self.text
    }
}

/// How a non-interactive run ended, mapped to the process exit code by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Succeeded,
    Failed,
}

pub async fn run(args: Cli) -> Result<RunStatus> {
    if args.silent && !(args.json || args.text) {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --json or --text."
        ));
    }

    let cfg = build_config(&args)?;

    #[cfg(feature = "tui")]
    {
        if args.is_interactive() {
            crate::tui::run(args, cfg).await?;
            return Ok(RunStatus::Succeeded);
        }
    }

    if args.json {
        return run_json(args, cfg).await;
    }

    run_text(args, cfg).await
}

/// Build the resolved config from defaults, the config file and CLI flags.
pub fn build_config(args: &Cli) -> Result<AppConfig> {
    let file = config::load_file(args.config.as_deref()).context("failed to load config")?;
    let overrides = Overrides {
        encrypt_tool: args.encrypt_tool.clone(),
        compress_tool: args.compress_tool.clone(),
        progress_duration: args.progress_duration.map(Duration::from),
    };
    let cfg = AppConfig::resolve(file, overrides);
    tracing::debug!(?cfg, "resolved config");
    Ok(cfg)
}

/// Build the orchestrator backed by real engine processes.
pub fn build_orchestrator(cfg: &AppConfig) -> Orchestrator {
    let engine = ProcessEngine::new(cfg.encrypt_tool.clone(), cfg.compress_tool.clone());
    Orchestrator::new(Arc::new(engine), cfg.progress_duration)
}

/// Build the request from CLI arguments. Missing paths become empty paths so
/// the orchestrator reports them like any other validation failure.
pub fn build_request(args: &Cli) -> OperationRequest {
    OperationRequest::new(
        args.input.clone().unwrap_or_default(),
        args.output.clone().unwrap_or_default(),
        args.operation.into(),
        args.password.clone(),
    )
}

async fn run_json(args: Cli, cfg: AppConfig) -> Result<RunStatus> {
    let orch = build_orchestrator(&cfg);
    let request = build_request(&args);
    let kind = request.kind();

    let started = Instant::now();
    let outcome = orch
        .submit(request.clone())
        .await
        .context("orchestrator refused the operation")?;
    let status = status_of(outcome.is_success());

    if args.silent {
        if let Some(reason) = outcome.reason() {
            eprintln!("{reason}");
        }
        return Ok(status);
    }

    let report = build_report(
        kind,
        request.input_path(),
        request.output_path(),
        started.elapsed(),
        outcome,
    );
    let (out_tx, out_handle) = spawn_output_writer();
    let out = serde_json::to_string_pretty(&report)?;
    let _ = out_tx.send(OutputLine::Stdout(out));
    drop(out_tx);
    let _ = out_handle.await;

    Ok(status)
}

async fn run_text(args: Cli, cfg: AppConfig) -> Result<RunStatus> {
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<OrchestratorEvent>();
    let orch = build_orchestrator(&cfg).with_events(evt_tx);
    let request = build_request(&args);

    let handle = tokio::spawn(async move { orch.submit(request).await });

    let (out_tx, out_handle) = spawn_output_writer();
    let mut last_decile = None;
    let mut outcome = None;

    // The sender lives inside the orchestrator, so the stream ends once submit returns.
    while let Some(ev) = evt_rx.recv().await {
        if args.silent {
            if let OrchestratorEvent::Completed { outcome: o, .. } = ev {
                outcome = Some(o);
            }
            continue;
        }
        match ev {
            OrchestratorEvent::Status(s) => {
                let _ = out_tx.send(OutputLine::Stderr(s));
            }
            OrchestratorEvent::Progress(p) => {
                // One line per 10% keeps the log readable.
                let decile = p / 10;
                if last_decile != Some(decile) || p == PROGRESS_DONE {
                    last_decile = Some(decile);
                    let _ = out_tx.send(OutputLine::Stderr(format!("Progress: {p}%")));
                }
            }
            OrchestratorEvent::Completed { kind, outcome: o } => {
                let _ = out_tx.send(OutputLine::Stdout(o.to_message(kind)));
                outcome = Some(o);
            }
            OrchestratorEvent::StateChanged(_) | OrchestratorEvent::Rejected => {}
        }
    }

    let joined = handle.await.context("operation task failed")?;
    let outcome = match (outcome, joined) {
        (Some(o), _) => o,
        (None, Ok(o)) => o,
        (None, Err(e)) => return Err(e).context("orchestrator refused the operation"),
    };

    if args.silent {
        if let Some(reason) = outcome.reason() {
            let _ = out_tx.send(OutputLine::Stderr(reason.to_string()));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;

    Ok(status_of(outcome.is_success()))
}

fn status_of(success: bool) -> RunStatus {
    if success {
        RunStatus::Succeeded
    } else {
        RunStatus::Failed
    }
}
