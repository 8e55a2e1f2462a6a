//! Integration test utilities for source correlation

pub mod package;

pub use package::{Functions, Nodes, Objects, PackageFixture, Stage};

use tracing::trace;
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly subscriber honoring `RUST_LOG`.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
    {
        trace!(%error, "subscriber already installed");
    }
}
