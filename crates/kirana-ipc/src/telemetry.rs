//! # Telemetry
//!
//! Structured logging setup for the desktop process.
//!
//! Filtering follows `RUST_LOG` when set (`RUST_LOG=kirana_db=debug`),
//! otherwise defaults to `info`. Output goes to stderr so the shell's
//! stdout stays free for the IPC transport.

use tracing_subscriber::{fmt, EnvFilter};

/// Initializes the global tracing subscriber. Call once at startup;
/// a second call is a silent no-op (useful in tests).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
