//! Integration test crate for Cutline.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on the cutline crates to verify they work together.

use tracing_subscriber::EnvFilter;

/// Install a test-friendly tracing subscriber once per process.
/// Controlled with `RUST_LOG`; silent by default.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod properties;

#[cfg(test)]
mod timeline;
