//! Cycle-driven co-simulation driver.
//!
//! The driver owns the external memories and the input signal map, and advances the core one
//! clock at a time. After each cycle it performs, in order:
//! 1. **Halt:** Stop if `halt` is asserted; nothing else is sampled on that cycle.
//! 2. **Weight feed:** On `read_weights`, move to the next tile, holding the last one past the end.
//! 3. **Host read:** On `hostmem_re`, present the addressed cell next cycle, holding on a miss.
//! 4. **Host write:** On `hostmem_we`, store the data, after the read has been resolved.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::common::error::{SimError, SimResult};
use crate::config::Config;
use crate::memory::MemoryImage;
use crate::sim::engine::{InputSignals, SimEngine, Signal};
use crate::sim::loader::Program;
use crate::stats::CoSimStats;
use crate::trace::{CycleRecord, TraceSink};

/// Lifecycle of a co-simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// The core has not asserted `halt` yet.
    Running,
    /// The core asserted `halt`; no further cycles are executed.
    Halted,
}

/// Drives a [`SimEngine`] cycle by cycle against emulated host and weight memories.
#[derive(Debug)]
pub struct CoSimDriver<E> {
    engine: E,
    hostmem: MemoryImage,
    weights: MemoryImage,
    windex: u64,
    inputs: InputSignals,
    state: DriverState,
    max_cycles: Option<u64>,
    stats: CoSimStats,
}

impl<E: SimEngine> CoSimDriver<E> {
    /// Prepares a co-simulation: preloads instruction memory and seeds the first inputs.
    ///
    /// `weights_in` starts at tile 0 and `hostmem_rdata` at 0.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::EmptyWeightMemory`] if there is no tile 0, or the engine's error if
    /// it rejects the instruction preload. No cycle is run in either case.
    pub fn new(
        mut engine: E,
        program: &Program,
        hostmem: MemoryImage,
        weights: MemoryImage,
        config: &Config,
    ) -> SimResult<Self> {
        let first_tile = weights.get(0).cloned().ok_or(SimError::EmptyWeightMemory)?;
        engine.load_instruction_memory(&program.memory_map())?;
        tracing::debug!(
            instructions = program.len(),
            host_cells = hostmem.len(),
            weight_tiles = weights.len(),
            "co-simulation ready"
        );
        Ok(Self {
            engine,
            hostmem,
            weights,
            windex: 0,
            inputs: InputSignals::new(first_tile),
            state: DriverState::Running,
            max_cycles: config.general.max_cycles,
            stats: CoSimStats::default(),
        })
    }

    /// Advances one clock cycle and services the memory requests it produced.
    ///
    /// Calling this after the core halted does nothing and returns [`DriverState::Halted`].
    ///
    /// # Errors
    ///
    /// Propagates engine and trace errors, returns [`SimError::HostAddressOutOfRange`] for a
    /// write address wider than 64 bits, and [`SimError::CycleLimitExceeded`] when the
    /// configured cycle cap is reached without a halt.
    pub fn step_cycle<T: TraceSink + ?Sized>(&mut self, trace: &mut T) -> SimResult<DriverState> {
        if self.state == DriverState::Halted {
            return Ok(DriverState::Halted);
        }

        let mut record = trace.enabled().then(|| CycleRecord {
            cycle: self.stats.cycles,
            inputs: self.inputs.clone(),
            halt: false,
            read_weights: false,
            read: None,
            write: None,
        });

        self.engine.step(&self.inputs)?;
        self.stats.cycles += 1;

        if self.engine.inspect_flag(Signal::Halt)? {
            self.state = DriverState::Halted;
            if let Some(record) = record.as_mut() {
                record.halt = true;
            }
            tracing::info!(cycles = self.stats.cycles, "core halted");
        } else {
            let read_weights = self.engine.inspect_flag(Signal::ReadWeights)?;
            if read_weights {
                self.advance_weights();
            }

            let read = if self.engine.inspect_flag(Signal::HostmemRe)? {
                let raddr = self.engine.inspect(Signal::HostmemRaddr)?;
                self.serve_read(&raddr);
                Some(raddr)
            } else {
                None
            };

            // The read above already saw pre-write memory.
            let write = if self.engine.inspect_flag(Signal::HostmemWe)? {
                let waddr = self.engine.inspect(Signal::HostmemWaddr)?;
                let wdata = self.engine.inspect(Signal::HostmemWdata)?;
                self.apply_write(&waddr, wdata.clone())?;
                Some((waddr, wdata))
            } else {
                None
            };

            if let Some(record) = record.as_mut() {
                record.read_weights = read_weights;
                record.read = read;
                record.write = write;
            }
        }

        if let Some(record) = record {
            trace.record(&record)?;
        }

        if self.state == DriverState::Running
            && self.max_cycles.is_some_and(|cap| self.stats.cycles >= cap)
        {
            return Err(SimError::CycleLimitExceeded {
                cycles: self.stats.cycles,
            });
        }
        Ok(self.state)
    }

    /// Runs until the core halts and returns the number of cycles executed.
    ///
    /// Without a configured cycle cap this never returns for a core that does not halt.
    ///
    /// # Errors
    ///
    /// See [`step_cycle`](Self::step_cycle).
    pub fn run<T: TraceSink + ?Sized>(&mut self, trace: &mut T) -> SimResult<u64> {
        while self.step_cycle(trace)? == DriverState::Running {}
        Ok(self.stats.cycles)
    }

    fn advance_weights(&mut self) {
        self.windex = self.windex.saturating_add(1);
        if let Some(tile) = self.weights.get(self.windex) {
            self.inputs.weights_in = tile.clone();
            self.stats.weight_advances += 1;
            tracing::debug!(windex = self.windex, "advanced weight tile");
        } else {
            self.stats.weight_holds += 1;
            tracing::debug!(windex = self.windex, "no weight tile, holding previous");
        }
    }

    fn serve_read(&mut self, raddr: &BigUint) {
        match raddr.to_u64().and_then(|addr| self.hostmem.get(addr)) {
            Some(cell) => {
                self.inputs.hostmem_rdata = cell.clone();
                self.stats.host_reads += 1;
                tracing::debug!(addr = %raddr, "host memory read");
            }
            None => {
                self.stats.host_read_misses += 1;
                tracing::debug!(addr = %raddr, "host memory miss, holding previous data");
            }
        }
    }

    fn apply_write(&mut self, waddr: &BigUint, wdata: BigUint) -> SimResult<()> {
        let addr = waddr
            .to_u64()
            .ok_or_else(|| SimError::HostAddressOutOfRange(waddr.clone()))?;
        let _ = self.hostmem.write(addr, wdata);
        self.stats.host_writes += 1;
        tracing::debug!(addr, "host memory write");
        Ok(())
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> DriverState {
        self.state
    }

    /// Returns `true` once the core has halted.
    pub fn is_halted(&self) -> bool {
        self.state == DriverState::Halted
    }

    /// Index of the weight tile most recently requested.
    ///
    /// May exceed the highest populated tile, in which case the last tile is still presented.
    pub const fn windex(&self) -> u64 {
        self.windex
    }

    /// Inputs that will be presented on the next cycle.
    pub const fn inputs(&self) -> &InputSignals {
        &self.inputs
    }

    /// Host memory in its current state.
    pub const fn hostmem(&self) -> &MemoryImage {
        &self.hostmem
    }

    /// Weight memory.
    pub const fn weights(&self) -> &MemoryImage {
        &self.weights
    }

    /// Counters collected so far.
    pub const fn stats(&self) -> &CoSimStats {
        &self.stats
    }

    /// The wrapped engine.
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Consumes the driver, returning the engine and the final host and weight memories.
    pub fn into_parts(self) -> (E, MemoryImage, MemoryImage) {
        (self.engine, self.hostmem, self.weights)
    }
}
