//! Python↔Rust conversion helpers.
//!
//! Converts Python dicts into the core `Config` type via JSON serialization, so the same
//! schema is used from both Python and the CLI, and maps driver errors onto Python exceptions.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use tpusim_core::common::SimError;
use tpusim_core::config::Config;

/// Converts a Python dict to a driver `Config`.
///
/// The dict is serialized to JSON and then parsed and validated by [`Config::from_json`].
/// Keys must match the Rust config structure (`general`, `program`, `memory`, `trace`).
///
/// # Arguments
///
/// * `py` - Python interpreter handle.
/// * `dict` - A Python dict such as `{"memory": {"matrix_size": 4}}`.
///
/// # Returns
///
/// The validated `Config`, or a `ValueError` if the dict is invalid.
pub fn py_dict_to_config(py: Python<'_>, dict: &Bound<'_, PyAny>) -> PyResult<Config> {
    let json = py.import("json")?;
    let dumps = json.getattr("dumps")?;
    let json_str: String = dumps.call1((dict,))?.extract()?;
    Config::from_json(&json_str).map_err(sim_err)
}

/// Maps a driver error onto a Python exception.
///
/// Problems with the inputs (program, arrays, config) raise `ValueError`; failures while
/// running raise `RuntimeError`.
pub fn sim_err(err: SimError) -> PyErr {
    match err {
        SimError::InvalidInstructionWidth { .. }
        | SimError::MalformedProgram { .. }
        | SimError::EmptyWeightMemory
        | SimError::Npy(_)
        | SimError::Config(_) => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}
