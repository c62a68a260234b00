//! Simulation error definitions.
//!
//! This module defines the error handling for the co-simulation subsystem. It provides:
//! 1. **Load-time failures:** Malformed programs, bad instruction widths, unreadable or
//!    unsupported array files.
//! 2. **Run-time failures:** Engine errors, out-of-range write addresses, the cycle cap.
//! 3. **Trace failures:** I/O errors while exporting the waveform.
//!
//! Memory misses (an absent weight tile or host address) are not errors: the driver holds
//! the previous output value.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading inputs, driving the engine, or exporting traces.
#[derive(Debug, Error)]
pub enum SimError {
    /// The configured instruction width is zero or not a whole number of bytes.
    #[error("instruction width of {bits} bits is not a positive multiple of 8")]
    InvalidInstructionWidth {
        /// The rejected width in bits.
        bits: u32,
    },

    /// The program byte stream ends in a partial instruction word.
    #[error("program of {len} bytes is not a multiple of the {width}-byte instruction width")]
    MalformedProgram {
        /// Total length of the byte stream.
        len: usize,
        /// Instruction width in bytes.
        width: usize,
    },

    /// Weight memory has no tile 0 to present before the first cycle.
    #[error("weight memory is empty; tile 0 is required before the first cycle")]
    EmptyWeightMemory,

    /// A file could not be read or written.
    #[error("could not access '{}': {source}", path.display())]
    Io {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A NumPy array file could not be decoded.
    #[error(transparent)]
    Npy(#[from] NpyError),

    /// The configuration is invalid or could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The simulation engine failed to step, inspect, or accept a preload.
    #[error("simulation engine error: {0}")]
    Engine(String),

    /// The core requested a host-memory write at an address wider than 64 bits.
    #[error("host memory write address {0:#x} does not fit in 64 bits")]
    HostAddressOutOfRange(num_bigint::BigUint),

    /// The configured cycle cap was reached without the core asserting `halt`.
    #[error("core did not halt within {cycles} cycles")]
    CycleLimitExceeded {
        /// Number of cycles executed.
        cycles: u64,
    },

    /// Writing the waveform trace failed.
    #[error("trace export failed: {0}")]
    Trace(#[source] io::Error),
}

/// Errors raised while decoding a NumPy `.npy` file.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NpyError {
    /// The file does not start with `\x93NUMPY`.
    #[error("not a valid .npy file (bad magic)")]
    BadMagic,

    /// The format major version is not 1, 2 or 3.
    #[error("unsupported .npy format version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    /// The header is truncated, not text, or missing a required key.
    #[error("malformed .npy header: {0}")]
    MalformedHeader(String),

    /// The element type is not a supported integer or boolean dtype.
    #[error("unsupported dtype '{0}' (integer and bool dtypes only)")]
    UnsupportedDtype(String),

    /// The array is stored in Fortran (column-major) order.
    #[error("fortran-ordered arrays are not supported")]
    FortranOrder,

    /// The payload length does not match the declared shape.
    #[error("payload holds {actual} bytes but shape requires {expected}")]
    PayloadSize {
        /// Bytes required by shape and dtype.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The array does not have the number of dimensions its role requires.
    #[error("expected a {expected}-D array, found {actual}-D")]
    Dimensions {
        /// Required number of dimensions.
        expected: usize,
        /// Dimensions in the file.
        actual: usize,
    },
}

/// Result alias used throughout the crate.
pub type SimResult<T> = Result<T, SimError>;
