//! Tracing subscriber configuration for mesh nodes.
//!
//! Log levels follow these conventions:
//! - ERROR: Unrecoverable failures
//! - WARN: Recoverable anomalies (dropped outbound frames, closed channels)
//! - INFO: Lifecycle events (node start, shutdown)
//! - DEBUG: Path state changes (route applied, discovery started, PERR sent)
//! - TRACE: Per-frame drops and wire-level detail

use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence over `default_level` (usually the
/// `[logging] level` from the node configuration).
pub fn init(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .init();
}

/// Initialize the tracing subscriber with JSON output.
///
/// Activated by setting `RUST_LOG_FORMAT=json`.
pub fn init_json(default_level: &str) {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(default_level))
        .init();
}

/// Pick plain or JSON output from `RUST_LOG_FORMAT`.
pub fn init_from_env(default_level: &str) {
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        init_json(default_level);
    } else {
        init(default_level);
    }
}

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` so repeated calls from several tests are harmless.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}
