//! Tracing setup for embedders.
//!
//! The library itself only emits `tracing` events; calling one of these
//! initializers is optional and up to the embedding application.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging with sensible defaults (INFO, overridable via RUST_LOG).
pub fn init() {
    init_with_level("info")
}

/// Initialize logging with a specific default level.
///
/// The `RUST_LOG` environment variable still takes precedence.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}
