//! Python bindings for the TPU co-simulation driver.
//!
//! This crate exposes the driver to Python via PyO3. It provides:
//! 1. **Co-simulation:** `CoSim`, which drives a Python-side engine against emulated memories.
//! 2. **Engine adapter:** `PyEngine`, the [`SimEngine`](tpusim_core::sim::SimEngine) over a
//!    Python object.
//! 3. **Codec:** `concat_vec`, `concat_tile`, `make_vec`, `split_tile`, `decode_program`.
//! 4. **Statistics:** `Stats` for driver counters and printing.
//! 5. **Utilities:** Version string and conversion helpers for Python↔Rust types.

use pyo3::prelude::*;

/// Packing and decoding functions.
pub mod codec;
/// Python dict to Rust `Config` conversion and error mapping.
pub mod conversion;
/// Co-simulation binding (`CoSim`).
pub mod cosim;
/// Engine adapter over a Python simulation object.
pub mod engine;
/// Statistics binding (`Stats`).
pub mod stats;
/// Utility functions (e.g., version).
pub mod utils;

/// Registers all classes and functions onto the given Python module.
///
/// Also installs a `tracing` subscriber filtered by `RUST_LOG`, unless one is already set.
///
/// # Errors
///
/// Returns a `PyErr` if registration fails.
pub fn register_cosim_module(m: &Bound<'_, PyModule>) -> PyResult<()> {
    utils::init_logging();

    m.add_class::<cosim::PyCoSim>()?;
    m.add_class::<stats::PyStats>()?;

    m.add_function(wrap_pyfunction!(codec::concat_vec, m)?)?;
    m.add_function(wrap_pyfunction!(codec::concat_tile, m)?)?;
    m.add_function(wrap_pyfunction!(codec::make_vec, m)?)?;
    m.add_function(wrap_pyfunction!(codec::split_tile, m)?)?;
    m.add_function(wrap_pyfunction!(codec::decode_program, m)?)?;
    m.add_function(wrap_pyfunction!(utils::version, m)?)?;

    Ok(())
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    register_cosim_module(m)
}
