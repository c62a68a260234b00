//! Per-cycle signal tracing.
//!
//! The driver reports every completed cycle to a [`TraceSink`]. This module provides:
//! 1. **Records:** What the driver presented and observed on one cycle.
//! 2. **Sinks:** `NullTrace` (discard) and `SignalHistory` (keep everything in memory).
//! 3. **Export:** Value-change dump output of a recorded history (see [`vcd`]).

/// Value-change dump export.
pub mod vcd;

use num_bigint::BigUint;

use crate::common::error::SimResult;
use crate::sim::engine::{InputSignals, Signal};

/// One completed cycle as seen by the driver.
///
/// Output signals are only present when the driver sampled them: a halting cycle carries no
/// read or write, and addresses are only sampled while their enable is asserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleRecord {
    /// Cycle index, 0 for the first clock advance.
    pub cycle: u64,
    /// Inputs applied during this cycle.
    pub inputs: InputSignals,
    /// `halt` was asserted.
    pub halt: bool,
    /// `read_weights` was asserted.
    pub read_weights: bool,
    /// Sampled `hostmem_raddr` when `hostmem_re` was asserted.
    pub read: Option<BigUint>,
    /// Sampled `(hostmem_waddr, hostmem_wdata)` when `hostmem_we` was asserted.
    pub write: Option<(BigUint, BigUint)>,
}

impl CycleRecord {
    /// Value of `signal` on this cycle, or `None` if it was not sampled.
    pub fn value(&self, signal: Signal) -> Option<BigUint> {
        let flag = |on: bool| Some(BigUint::from(u8::from(on)));
        match signal {
            Signal::WeightsIn | Signal::HostmemRdata => self.inputs.get(signal).cloned(),
            Signal::Halt => flag(self.halt),
            Signal::ReadWeights => flag(self.read_weights),
            Signal::HostmemRe => flag(self.read.is_some()),
            Signal::HostmemRaddr => self.read.clone(),
            Signal::HostmemWe => flag(self.write.is_some()),
            Signal::HostmemWaddr => self.write.as_ref().map(|(addr, _)| addr.clone()),
            Signal::HostmemWdata => self.write.as_ref().map(|(_, data)| data.clone()),
        }
    }
}

/// Consumer of per-cycle records.
pub trait TraceSink {
    /// Receives one completed cycle.
    ///
    /// # Errors
    ///
    /// Implementations that write as they go may return
    /// [`SimError::Trace`](crate::common::SimError::Trace).
    fn record(&mut self, record: &CycleRecord) -> SimResult<()>;

    /// Returns `false` if records are discarded, letting the driver skip building them.
    fn enabled(&self) -> bool {
        true
    }
}

/// Sink that discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn record(&mut self, _record: &CycleRecord) -> SimResult<()> {
        Ok(())
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// Sink that keeps the full signal history in memory.
#[derive(Debug, Clone, Default)]
pub struct SignalHistory {
    records: Vec<CycleRecord>,
}

impl SignalHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded cycles in order.
    pub fn records(&self) -> &[CycleRecord] {
        &self.records
    }

    /// Number of recorded cycles.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops all recorded cycles.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl TraceSink for SignalHistory {
    fn record(&mut self, record: &CycleRecord) -> SimResult<()> {
        self.records.push(record.clone());
        Ok(())
    }
}
