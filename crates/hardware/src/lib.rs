//! TPU co-simulation driver library.
//!
//! This crate drives a clock-stepped simulation of a matrix accelerator core and emulates
//! the memories around it:
//! 1. **Codec:** Packing integer vectors and tiles into wide words and back.
//! 2. **Memory:** Sparse host and weight memory images.
//! 3. **Simulation:** Program loading, the engine seam, and the cycle driver.
//! 4. **Trace:** Per-cycle signal history and value-change dump export.
//! 5. **Configuration and statistics.**

/// Common types and constants (errors, signal names, codec shifts).
pub mod common;
/// Co-simulation configuration (geometry, limits, tracing).
pub mod config;
/// Word codec and sparse memory images.
pub mod memory;
/// Loader, engine seam, and driver.
pub mod sim;
/// Co-simulation statistics collection and reporting.
pub mod stats;
/// Per-cycle tracing and waveform export.
pub mod trace;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Error type returned throughout the crate.
pub use crate::common::{SimError, SimResult};
/// Sparse address to cell map used for host and weight memory.
pub use crate::memory::MemoryImage;
/// Main driver type; construct with `CoSimDriver::new`.
pub use crate::sim::CoSimDriver;
/// Decoded instruction program.
pub use crate::sim::Program;
