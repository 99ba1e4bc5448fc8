//! Application-level orchestration.
//!
//! This module owns the operation lifecycle (validate, run the engine, pace the
//! progress gauge, report the outcome) and the post-run report. UI/CLI layers
//! call into this module to keep responsibilities separated.

mod controller;
mod machine;
mod post_process;
mod progress;

pub use controller::{run_controller, UiCommand};
pub use machine::{Orchestrator, STATUS_EXECUTING, STATUS_PREPARING};
pub use post_process::build_report;
pub use progress::{PROGRESS_CEILING, PROGRESS_DONE};
