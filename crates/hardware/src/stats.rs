//! Co-simulation statistics collection and reporting.
//!
//! This module tracks what the driver did on behalf of the core. It provides:
//! 1. **Cycles:** Clock advances and host wall time.
//! 2. **Weight feed:** Tile advances and advances held past the last tile.
//! 3. **Host memory:** Reads, reads held on a missing address, and writes.

use std::fmt::Write as _;
use std::time::Instant;

/// Counters updated by the driver once per cycle.
#[derive(Debug, Clone)]
pub struct CoSimStats {
    start_time: Instant,
    /// Total clock cycles advanced.
    pub cycles: u64,
    /// `read_weights` pulses that moved to a populated tile.
    pub weight_advances: u64,
    /// `read_weights` pulses past the last tile (previous tile held).
    pub weight_holds: u64,
    /// Host-memory reads served from a populated address.
    pub host_reads: u64,
    /// Host-memory reads of an absent address (previous data held).
    pub host_read_misses: u64,
    /// Host-memory writes applied.
    pub host_writes: u64,
}

impl Default for CoSimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            weight_advances: 0,
            weight_holds: 0,
            host_reads: 0,
            host_read_misses: 0,
            host_writes: 0,
        }
    }
}

impl CoSimStats {
    /// Renders the statistics block.
    pub fn render(&self) -> String {
        let seconds = self.start_time.elapsed().as_secs_f64();
        let khz = if seconds > 0.0 {
            (self.cycles as f64 / seconds) / 1000.0
        } else {
            0.0
        };
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "TPU CO-SIMULATION STATISTICS");
        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "host_seconds             {seconds:.4} s");
        let _ = writeln!(out, "sim_cycles               {}", self.cycles);
        let _ = writeln!(out, "sim_freq                 {khz:.2} kHz");
        let _ = writeln!(out, "----------------------------------------------------------");
        let _ = writeln!(out, "WEIGHT FEED");
        let _ = writeln!(out, "  weights.advances       {}", self.weight_advances);
        let _ = writeln!(out, "  weights.held           {}", self.weight_holds);
        let _ = writeln!(out, "HOST MEMORY");
        let _ = writeln!(out, "  hostmem.reads          {}", self.host_reads);
        let _ = writeln!(out, "  hostmem.read_misses    {}", self.host_read_misses);
        let _ = writeln!(out, "  hostmem.writes         {}", self.host_writes);
        let _ = writeln!(out, "==========================================================");
        out
    }

    /// Prints the statistics block to stdout.
    pub fn print(&self) {
        print!("{}", self.render());
    }
}
