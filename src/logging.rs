//! Tracing subscriber setup for the `cvp` binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job. `RUST_LOG` (also read from `.env`) always wins over the
//! level picked by the command.

use tracing_subscriber::EnvFilter;

/// Default filter for one-shot commands.
pub const CLI_LEVEL: &str = "warn";
/// Default filter with `--verbose`.
pub const VERBOSE_LEVEL: &str = "debug";
/// Default filter while the TUI owns the terminal.
pub const TUI_LEVEL: &str = "error";

/// Install a stderr fmt subscriber. Safe to call more than once.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
