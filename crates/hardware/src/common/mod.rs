//! Common utilities and types used throughout the co-simulation crate.
//!
//! This module provides the building blocks shared by every component. It includes:
//! 1. **Constants:** Default element width and the fixed decode shift steps.
//! 2. **Error Handling:** The `SimError` taxonomy and the `.npy` decoding errors.

/// Common constants used throughout the crate.
pub mod constants;

/// Error types for loading, simulation, and trace export.
pub mod error;

pub use constants::{ELEMENT_BITS, IMEM};
pub use error::{NpyError, SimError, SimResult};
