//! Tracing subscriber configuration for sensormesh nodes.
//!
//! Log levels follow these conventions:
//! - ERROR: Coprocessor missing or not personalized
//! - WARN: Timeouts, retries, rejected signatures, entering FAILURE
//! - INFO: State transitions, parent selection, address assignment
//! - DEBUG: Nonce exchange, candidate parents, dropped frames
//! - TRACE: Per-frame send and receive detail
//!
//! Nonce, HMAC and key bytes are never logged at any level.

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` if set, otherwise `default_level` (usually from `[logging]`).
fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize the tracing subscriber with human-readable output.
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

/// Initialize the tracing subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("debug"))
        .with_test_writer()
        .try_init();
}
