//! Tracing/logging initialization.
//!
//! JSON lines with timestamps, filtered through `RUST_LOG` (default `info`).
//! Audit events are emitted under the `audit` target, so they can be routed
//! or silenced independently, e.g. `RUST_LOG=info,audit=warn`.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_current_span(true)
        .with_target(true)
        .try_init();
}
