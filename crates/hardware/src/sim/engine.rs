//! Simulation engine seam and the signal contract.
//!
//! The accelerator core and its clock-stepped simulator are external. This module defines
//! what the driver needs from them. It provides:
//! 1. **Signals:** The named memory-interface signals shared with the core.
//! 2. **Inputs:** The driver-owned map of values presented to the core each cycle.
//! 3. **Engine trait:** Preload instruction memory, advance one cycle, inspect a signal.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::common::error::{SimError, SimResult};

/// Memory-interface signals between the driver and the core.
///
/// Names returned by [`Signal::name`] are the contract with the core and must match its
/// wire names exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    /// Current weight tile presented to the core (input).
    WeightsIn,
    /// Pulse requesting the next weight tile (output).
    ReadWeights,
    /// Core has finished; stop advancing the clock (output).
    Halt,
    /// Host-memory read enable (output).
    HostmemRe,
    /// Host-memory read address (output).
    HostmemRaddr,
    /// Host-memory read data returned to the core (input).
    HostmemRdata,
    /// Host-memory write enable (output).
    HostmemWe,
    /// Host-memory write address (output).
    HostmemWaddr,
    /// Host-memory write data (output).
    HostmemWdata,
}

impl Signal {
    /// Every contract signal, inputs first.
    pub const ALL: [Self; 9] = [
        Self::WeightsIn,
        Self::HostmemRdata,
        Self::Halt,
        Self::ReadWeights,
        Self::HostmemRe,
        Self::HostmemRaddr,
        Self::HostmemWe,
        Self::HostmemWaddr,
        Self::HostmemWdata,
    ];

    /// Wire name on the core.
    pub const fn name(self) -> &'static str {
        match self {
            Self::WeightsIn => "weights_in",
            Self::ReadWeights => "read_weights",
            Self::Halt => "halt",
            Self::HostmemRe => "hostmem_re",
            Self::HostmemRaddr => "hostmem_raddr",
            Self::HostmemRdata => "hostmem_rdata",
            Self::HostmemWe => "hostmem_we",
            Self::HostmemWaddr => "hostmem_waddr",
            Self::HostmemWdata => "hostmem_wdata",
        }
    }

    /// Returns `true` for signals the driver drives into the core.
    pub const fn is_input(self) -> bool {
        matches!(self, Self::WeightsIn | Self::HostmemRdata)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Signal {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|signal| signal.name() == s)
            .ok_or_else(|| SimError::Engine(format!("unknown signal '{s}'")))
    }
}

/// Values the driver presents to the core on the next cycle.
///
/// Owned by the driver and passed by reference to [`SimEngine::step`]; values persist from
/// cycle to cycle until the driver replaces them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSignals {
    /// Packed weight tile at the current weight index.
    pub weights_in: BigUint,
    /// Packed host vector for the most recent successful read, initially 0.
    pub hostmem_rdata: BigUint,
}

impl InputSignals {
    /// Creates the initial input map for the given first weight tile.
    pub fn new(weights_in: BigUint) -> Self {
        Self {
            weights_in,
            hostmem_rdata: BigUint::zero(),
        }
    }

    /// Iterates `(signal, value)` pairs in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (Signal, &BigUint)> {
        [
            (Signal::WeightsIn, &self.weights_in),
            (Signal::HostmemRdata, &self.hostmem_rdata),
        ]
        .into_iter()
    }

    /// Returns the value of an input signal, or `None` for an output signal.
    pub const fn get(&self, signal: Signal) -> Option<&BigUint> {
        match signal {
            Signal::WeightsIn => Some(&self.weights_in),
            Signal::HostmemRdata => Some(&self.hostmem_rdata),
            _ => None,
        }
    }
}

/// A clock-stepped simulation of the accelerator core.
///
/// The driver calls [`load_instruction_memory`](SimEngine::load_instruction_memory) once,
/// then alternates [`step`](SimEngine::step) with [`inspect`](SimEngine::inspect) calls. The
/// core's full next state must be computed inside `step`.
pub trait SimEngine {
    /// Preloads the core's instruction memory ([`IMEM`](crate::common::IMEM)) before the first
    /// cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Engine`] if the engine rejects the preload.
    fn load_instruction_memory(&mut self, words: &BTreeMap<u64, BigUint>) -> SimResult<()>;

    /// Advances the core by exactly one clock cycle with the given inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Engine`] if the engine fails to evaluate the cycle.
    fn step(&mut self, inputs: &InputSignals) -> SimResult<()>;

    /// Returns the value of a signal after the most recent cycle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Engine`] if the signal cannot be read.
    fn inspect(&self, signal: Signal) -> SimResult<BigUint>;

    /// Returns `true` if a control signal is asserted (non-zero).
    ///
    /// # Errors
    ///
    /// Propagates errors from [`inspect`](SimEngine::inspect).
    fn inspect_flag(&self, signal: Signal) -> SimResult<bool> {
        Ok(!self.inspect(signal)?.is_zero())
    }
}
