//! Logging setup.
//!
//! Logs go to stderr so they never mix with JSON on stdout. `RUST_LOG` wins over
//! the `-v` count when set. Runs that own the terminal (the TUI) or promise a
//! bare failure message (`--silent`) log nothing.

use anyhow::{anyhow, Result};
use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Default filter when neither `RUST_LOG` nor `-v` is given.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Filter used when the terminal belongs to something else.
pub const QUIET_LOG_LEVEL: &str = "off";

/// Map the `-v` count to a filter directive.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => DEFAULT_LOG_LEVEL,
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Resolve the filter for this run. `quiet` overrides both `RUST_LOG` and `-v`.
pub fn env_filter(verbose: u8, quiet: bool) -> EnvFilter {
    if quiet {
        return EnvFilter::new(QUIET_LOG_LEVEL);
    }
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbose)))
}

/// The stderr subscriber, without installing it.
pub fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing::subscriber::set_global_default(subscriber(env_filter(verbose, quiet)))
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
