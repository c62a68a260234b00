//! Value-change dump export of a recorded signal history.
//!
//! One wire is declared per contract signal under a single top-level scope. Timestamps are
//! cycle indices; the first record is emitted inside `$dumpvars` and afterwards only changed
//! values are written. Unsampled outputs start as `x` and otherwise keep their last value.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use num_bigint::BigUint;
use ::vcd::{IdCode, SimulationCommand, TimescaleUnit, Value, Writer};

use crate::common::error::{SimError, SimResult};
use crate::config::MemoryConfig;
use crate::sim::engine::Signal;
use crate::trace::CycleRecord;

/// Bit widths of the exported wires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalWidths {
    /// Width of `weights_in` (one packed tile).
    pub tile: u32,
    /// Width of `hostmem_rdata` and `hostmem_wdata` (one packed vector).
    pub vector: u32,
    /// Width of the host-memory address signals.
    pub addr: u32,
}

impl SignalWidths {
    /// Derives wire widths from the memory geometry.
    pub const fn from_config(memory: &MemoryConfig) -> Self {
        Self {
            tile: memory.tile_bits(),
            vector: memory.vector_bits(),
            addr: memory.host_addr_bits,
        }
    }

    /// Width of the wire carrying `signal`.
    pub const fn of(&self, signal: Signal) -> u32 {
        match signal {
            Signal::WeightsIn => self.tile,
            Signal::HostmemRdata | Signal::HostmemWdata => self.vector,
            Signal::HostmemRaddr | Signal::HostmemWaddr => self.addr,
            Signal::Halt | Signal::ReadWeights | Signal::HostmemRe | Signal::HostmemWe => 1,
        }
    }
}

fn to_bits(value: &BigUint, width: u32) -> Vec<Value> {
    (0..width)
        .rev()
        .map(|i| {
            if value.bit(u64::from(i)) {
                Value::V1
            } else {
                Value::V0
            }
        })
        .collect()
}

fn emit<W: Write>(
    writer: &mut Writer<W>,
    id: IdCode,
    width: u32,
    value: Option<&BigUint>,
) -> io::Result<()> {
    if let Some(v) = value.filter(|v| v.bits() > u64::from(width)) {
        tracing::debug!(bits = v.bits(), width, "value wider than wire, truncated to low bits");
    }
    match (value, width) {
        (Some(v), 1) => writer.change_scalar(id, if v.bit(0) { Value::V1 } else { Value::V0 }),
        (None, 1) => writer.change_scalar(id, Value::X),
        (Some(v), _) => writer.change_vector(id, to_bits(v, width)),
        (None, _) => writer.change_vector(id, vec![Value::X; width as usize]),
    }
}

fn write_body<W: Write>(
    history: &[CycleRecord],
    widths: &SignalWidths,
    top_module: &str,
    out: W,
) -> io::Result<()> {
    let mut writer = Writer::new(out);
    writer.timescale(1, TimescaleUnit::NS)?;
    writer.add_module(top_module)?;
    let ids = Signal::ALL
        .iter()
        .map(|signal| writer.add_wire(widths.of(*signal), signal.name()))
        .collect::<io::Result<Vec<_>>>()?;
    writer.upscope()?;
    writer.enddefinitions()?;

    let mut last: Vec<Option<BigUint>> = vec![None; ids.len()];
    for (n, record) in history.iter().enumerate() {
        let changes: Vec<(usize, Option<BigUint>)> = Signal::ALL
            .iter()
            .enumerate()
            .filter_map(|(i, signal)| match record.value(*signal) {
                Some(v) if last[i].as_ref() != Some(&v) => Some((i, Some(v))),
                None if n == 0 => Some((i, None)),
                _ => None,
            })
            .collect();
        if changes.is_empty() {
            continue;
        }

        writer.timestamp(record.cycle)?;
        if n == 0 {
            writer.begin(SimulationCommand::Dumpvars)?;
        }
        for (i, value) in changes {
            emit(&mut writer, ids[i], widths.of(Signal::ALL[i]), value.as_ref())?;
            if value.is_some() {
                last[i] = value;
            }
        }
        if n == 0 {
            writer.end()?;
        }
    }
    if let Some(record) = history.last() {
        writer.timestamp(record.cycle + 1)?;
    }
    Ok(())
}

/// Writes `history` as a value-change dump to `out`.
///
/// # Errors
///
/// Returns [`SimError::Trace`] if writing fails.
pub fn write_vcd<W: Write>(
    history: &[CycleRecord],
    widths: &SignalWidths,
    top_module: &str,
    out: W,
) -> SimResult<()> {
    write_body(history, widths, top_module, out).map_err(SimError::Trace)
}

/// Writes `history` as a value-change dump file at `path`.
///
/// # Errors
///
/// Returns [`SimError::Trace`] if encoding fails and [`SimError::Io`] if the file cannot be
/// written.
pub fn export_vcd(
    history: &[CycleRecord],
    widths: &SignalWidths,
    top_module: &str,
    path: &Path,
) -> SimResult<()> {
    let mut buf = Vec::new();
    write_vcd(history, widths, top_module, &mut buf)?;
    fs::write(path, buf).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), cycles = history.len(), "wrote waveform trace");
    Ok(())
}
