//! Co-simulation Python binding.
//!
//! Exposes the cycle driver to Python: build from a Python engine object, the program bytes
//! and the host and weight arrays, run to halt, then read back host memory, statistics, and
//! the waveform trace.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use num_bigint::BigUint;
use pyo3::prelude::*;
use tpusim_core::config::Config;
use tpusim_core::memory::MemoryImage;
use tpusim_core::sim::driver::{CoSimDriver, DriverState};
use tpusim_core::sim::loader::Program;
use tpusim_core::trace::{NullTrace, SignalHistory};
use tpusim_core::trace::vcd::{SignalWidths, export_vcd};

use crate::conversion::{py_dict_to_config, sim_err};
use crate::engine::PyEngine;
use crate::stats::PyStats;

/// Cycles between checks for a pending `KeyboardInterrupt`.
const SIGNAL_CHECK_INTERVAL: u64 = 10_000;

/// Python-exposed co-simulation: wraps a `CoSimDriver` over a Python engine.
#[pyclass(name = "CoSim")]
#[derive(Debug)]
pub struct PyCoSim {
    inner: CoSimDriver<PyEngine>,
    history: SignalHistory,
    config: Config,
}

impl PyCoSim {
    fn step_once(&mut self) -> PyResult<DriverState> {
        let state = if self.config.trace.enabled {
            self.inner.step_cycle(&mut self.history)
        } else {
            self.inner.step_cycle(&mut NullTrace)
        };
        state.map_err(sim_err)
    }
}

#[pymethods]
impl PyCoSim {
    /// Creates a co-simulation and preloads the engine's instruction memory.
    ///
    /// # Arguments
    ///
    /// * `engine` - Object providing `load_memory`, `step`, and `inspect`.
    /// * `program` - Program bytes (big-endian instruction words).
    /// * `hostmem` - 2-D host memory array, one row per address.
    /// * `weights` - 3-D weight array, one tile per address.
    /// * `config` - Optional config dict; defaults apply to missing keys.
    #[new]
    #[pyo3(signature = (engine, program, hostmem, weights, config=None))]
    fn new(
        py: Python<'_>,
        engine: Py<PyAny>,
        program: Vec<u8>,
        hostmem: Vec<Vec<i64>>,
        weights: Vec<Vec<Vec<i64>>>,
        config: Option<&Bound<'_, PyAny>>,
    ) -> PyResult<Self> {
        let config = match config {
            Some(dict) => py_dict_to_config(py, dict)?,
            None => Config::default(),
        };
        let bits = config.memory.element_bits;
        let program =
            Program::decode(&program, config.program.instruction_width).map_err(sim_err)?;
        let inner = CoSimDriver::new(
            PyEngine::new(engine),
            &program,
            MemoryImage::from_vectors(hostmem.as_slice(), bits),
            MemoryImage::from_tiles(weights.as_slice(), bits),
            &config,
        )
        .map_err(sim_err)?;
        Ok(Self {
            inner,
            history: SignalHistory::new(),
            config,
        })
    }

    /// Runs until the core asserts `halt`.
    ///
    /// # Returns
    ///
    /// The total number of cycles executed.
    pub fn run(&mut self, py: Python<'_>) -> PyResult<u64> {
        while self.step_once()? == DriverState::Running {
            if self.inner.stats().cycles.is_multiple_of(SIGNAL_CHECK_INTERVAL) {
                py.check_signals()?;
                let _ = std::io::stdout().flush();
            }
        }
        Ok(self.inner.stats().cycles)
    }

    /// Advances a single cycle; returns `True` once the core has halted.
    pub fn step(&mut self) -> PyResult<bool> {
        Ok(self.step_once()? == DriverState::Halted)
    }

    /// Host memory as `{address: packed_vector}`.
    pub fn host_memory(&self) -> BTreeMap<u64, BigUint> {
        self.inner.hostmem().to_map()
    }

    /// Host memory unpacked, one `"{address} [elements]"` line per address.
    pub fn host_memory_dump(&self) -> String {
        self.inner
            .hostmem()
            .render_vectors(self.config.memory.element_bits)
    }

    /// Weight memory unpacked, one `"{index} [[row], ...]"` line per tile.
    pub fn weight_memory_dump(&self) -> String {
        self.inner.weights().render_tiles(
            self.config.memory.element_bits,
            self.config.memory.matrix_size,
        )
    }

    /// Writes the recorded signal history as a VCD file.
    ///
    /// # Arguments
    ///
    /// * `path` - Output path; defaults to the configured `trace.vcd_path`.
    #[pyo3(signature = (path=None))]
    pub fn write_vcd(&self, path: Option<PathBuf>) -> PyResult<()> {
        let path = path.unwrap_or_else(|| PathBuf::from(&self.config.trace.vcd_path));
        export_vcd(
            self.history.records(),
            &SignalWidths::from_config(&self.config.memory),
            &self.config.trace.top_module,
            &path,
        )
        .map_err(sim_err)
    }

    /// Index of the most recently requested weight tile.
    #[getter]
    pub fn windex(&self) -> u64 {
        self.inner.windex()
    }

    /// Cycles executed so far.
    #[getter]
    pub fn cycles(&self) -> u64 {
        self.inner.stats().cycles
    }

    /// Whether the core has halted.
    #[getter]
    pub fn halted(&self) -> bool {
        self.inner.is_halted()
    }

    /// Snapshot of the driver statistics.
    pub fn get_stats(&self) -> PyStats {
        PyStats {
            inner: self.inner.stats().clone(),
        }
    }
}
