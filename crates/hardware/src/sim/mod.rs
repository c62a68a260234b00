//! Co-simulation: program loading, the engine seam, and the cycle driver.
//!
//! This module drives an external accelerator core. It provides:
//! 1. **Loading:** Instruction binaries and `.npy` arrays into memory images.
//! 2. **Engine:** The signal contract and the clock-stepped engine trait.
//! 3. **Driver:** The per-cycle loop servicing weight and host-memory requests.

/// Cycle-driven co-simulation driver.
pub mod driver;
/// Signal contract and engine trait.
pub mod engine;
/// Instruction binary decoding and array loading.
pub mod loader;
/// NumPy `.npy` array reader.
pub mod npy;

pub use driver::{CoSimDriver, DriverState};
pub use engine::{InputSignals, SimEngine, Signal};
pub use loader::Program;
