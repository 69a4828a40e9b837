//! Debug tracing infrastructure for development diagnostics
//!
//! Provides structured logging with scoped filtering for debugging chain
//! mutations, render-queue behavior, and history replay.
//!
//! # Usage
//!
//! Configure via RUST_LOG environment variable:
//! - `RUST_LOG=debug` - all debug logs
//! - `RUST_LOG=vellum::mutation=debug` - mutation engine only
//! - `RUST_LOG=vellum::queue=trace` - queue slot movements

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize a console tracing subscriber, respecting RUST_LOG.
///
/// Safe to call more than once (e.g. from several tests); subsequent calls
/// are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
