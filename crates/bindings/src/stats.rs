//! Statistics Python binding.
//!
//! Exposes driver statistics to Python: getters for cycles and memory traffic, `print` for
//! human-readable output, and `to_dict` for JSON-serializable export.

use std::collections::BTreeMap;

use pyo3::prelude::*;
use tpusim_core::stats::CoSimStats;

/// Python-exposed statistics: a snapshot of `CoSimStats`.
#[pyclass(name = "Stats")]
#[derive(Debug, Clone)]
pub struct PyStats {
    /// Snapshot of the driver counters.
    pub inner: CoSimStats,
}

#[pymethods]
impl PyStats {
    #[getter]
    fn get_cycles(&self) -> u64 {
        self.inner.cycles
    }

    #[getter]
    fn get_weight_advances(&self) -> u64 {
        self.inner.weight_advances
    }

    #[getter]
    fn get_weight_holds(&self) -> u64 {
        self.inner.weight_holds
    }

    #[getter]
    fn get_host_reads(&self) -> u64 {
        self.inner.host_reads
    }

    #[getter]
    fn get_host_read_misses(&self) -> u64 {
        self.inner.host_read_misses
    }

    #[getter]
    fn get_host_writes(&self) -> u64 {
        self.inner.host_writes
    }

    /// Print the statistics block.
    fn print(&self) {
        self.inner.print();
    }

    /// All counters keyed by name.
    fn to_dict(&self) -> BTreeMap<&'static str, u64> {
        BTreeMap::from([
            ("cycles", self.inner.cycles),
            ("weight_advances", self.inner.weight_advances),
            ("weight_holds", self.inner.weight_holds),
            ("host_reads", self.inner.host_reads),
            ("host_read_misses", self.inner.host_read_misses),
            ("host_writes", self.inner.host_writes),
        ])
    }

    fn __repr__(&self) -> String {
        format!(
            "Stats(cycles={}, host_reads={}, host_writes={})",
            self.inner.cycles, self.inner.host_reads, self.inner.host_writes
        )
    }
}
