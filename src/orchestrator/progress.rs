//! Decorative progress ticker.
//!
//! The engines report nothing while they work, so the gauge is paced by a timer
//! instead. Values only ever go up and stop at [`PROGRESS_CEILING`]; the final
//! [`PROGRESS_DONE`] is reserved for the orchestrator once the engine exited 0.

use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Highest value the ticker reaches on its own.
pub const PROGRESS_CEILING: u8 = 99;
/// Value shown once an operation has succeeded.
pub const PROGRESS_DONE: u8 = 100;

/// Handle to a running ticker. Dropping it stops the ticker.
pub(crate) struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        // Dropping a JoinHandle detaches the task rather than cancelling it.
        self.handle.abort();
    }
}

/// Start a ticker that walks from 1 to [`PROGRESS_CEILING`] over `nominal`.
pub(crate) fn spawn_ticker(nominal: Duration) -> (ProgressTicker, UnboundedReceiver<u8>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_ticker(nominal, tx));
    (ProgressTicker { handle }, rx)
}

async fn run_ticker(nominal: Duration, tx: UnboundedSender<u8>) {
    let period = tick_period(nominal);
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for value in 1..=PROGRESS_CEILING {
        interval.tick().await;
        if tx.send(value).is_err() {
            break;
        }
    }
}

fn tick_period(nominal: Duration) -> Duration {
    (nominal / u32::from(PROGRESS_CEILING)).max(Duration::from_millis(1))
}
