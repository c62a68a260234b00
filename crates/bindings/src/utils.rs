//! Utility functions exposed to Python.
//!
//! Provides version and logging setup for the `tpusim` module.

use pyo3::prelude::*;
use tracing_subscriber::EnvFilter;

/// Returns the driver version string (e.g., for scripting or diagnostics).
///
/// # Returns
///
/// The crate version, such as `"0.3.0"`.
#[pyfunction]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Installs a `fmt` subscriber filtered by `RUST_LOG`; does nothing if one is already set.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
