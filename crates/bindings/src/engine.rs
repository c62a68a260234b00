//! Engine adapter over a Python simulation object.
//!
//! Lets the driver step a simulator that lives in Python (for example a PyRTL
//! `FastSimulation` wrapped in a small shim). The object must provide:
//! 1. `load_memory(name, mapping)`: preload a named memory with `{address: value}`.
//! 2. `step(inputs)`: advance one cycle with `{signal_name: value}`.
//! 3. `inspect(name)`: return the current integer value of a signal.

use std::collections::BTreeMap;

use num_bigint::BigUint;
use pyo3::prelude::*;
use pyo3::types::PyDict;
use tpusim_core::common::{IMEM, SimError, SimResult};
use tpusim_core::sim::engine::{InputSignals, SimEngine, Signal};

/// [`SimEngine`] backed by a Python object.
#[derive(Debug)]
pub struct PyEngine {
    obj: Py<PyAny>,
}

fn engine_err(err: PyErr) -> SimError {
    SimError::Engine(err.to_string())
}

impl PyEngine {
    /// Wraps a Python engine object.
    pub const fn new(obj: Py<PyAny>) -> Self {
        Self { obj }
    }

    /// The wrapped Python object.
    pub const fn object(&self) -> &Py<PyAny> {
        &self.obj
    }
}

impl SimEngine for PyEngine {
    fn load_instruction_memory(&mut self, words: &BTreeMap<u64, BigUint>) -> SimResult<()> {
        Python::with_gil(|py| {
            let mapping = PyDict::new(py);
            for (addr, word) in words {
                mapping.set_item(*addr, word.clone())?;
            }
            let _ = self.obj.call_method1(py, "load_memory", (IMEM, mapping))?;
            Ok(())
        })
        .map_err(engine_err)
    }

    fn step(&mut self, inputs: &InputSignals) -> SimResult<()> {
        Python::with_gil(|py| {
            let values = PyDict::new(py);
            for (signal, value) in inputs.iter() {
                values.set_item(signal.name(), value.clone())?;
            }
            let _ = self.obj.call_method1(py, "step", (values,))?;
            Ok(())
        })
        .map_err(engine_err)
    }

    fn inspect(&self, signal: Signal) -> SimResult<BigUint> {
        Python::with_gil(|py| {
            self.obj
                .call_method1(py, "inspect", (signal.name(),))?
                .extract::<BigUint>(py)
        })
        .map_err(engine_err)
    }
}
