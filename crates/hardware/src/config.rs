//! Configuration system for the co-simulation driver.
//!
//! This module defines the configuration structures used to parameterize the driver. It provides:
//! 1. **Defaults:** Baseline accelerator geometry (instruction width, element width, tile size).
//! 2. **Structures:** Hierarchical config for general, program, memory, and trace settings.
//! 3. **Validation:** Rejects geometries the packing fold cannot express.
//!
//! Configuration is supplied as JSON (from the Python API or `--config` on the CLI), or use
//! `Config::default()`.

use serde::Deserialize;

use crate::common::error::{SimError, SimResult};

/// Default configuration constants.
///
/// These values describe the reference accelerator: 14-byte instructions and an
/// 8x8 array of 8-bit elements.
mod defaults {
    /// Instruction word width in bits (14 bytes).
    pub const INSTRUCTION_WIDTH: u32 = 14 * 8;

    /// Width of one packed element in bits.
    pub const ELEMENT_BITS: u32 = crate::common::constants::ELEMENT_BITS;

    /// Side length of the square weight tile, and elements per host vector.
    pub const MATRIX_SIZE: usize = 8;

    /// Width of host-memory address signals in bits.
    pub const HOST_ADDR_BITS: u32 = 64;

    /// Waveform output path.
    pub const VCD_PATH: &str = "trace.vcd";

    /// Scope name wrapping the exported signals.
    pub const TOP_MODULE: &str = "tpu";
}

/// Root configuration structure containing all driver settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use tpusim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.program.instruction_width, 112);
/// assert_eq!(config.memory.element_bits, 8);
/// assert_eq!(config.general.max_cycles, None);
/// ```
///
/// Deserializing from JSON (typical Python API usage):
///
/// ```
/// use tpusim_core::config::Config;
///
/// let json = r#"{
///     "general": { "max_cycles": 5000 },
///     "program": { "instruction_width": 16 },
///     "memory": { "element_bits": 8, "matrix_size": 2 },
///     "trace": { "enabled": false }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.general.max_cycles, Some(5000));
/// assert_eq!(config.memory.vector_bits(), 16);
/// assert_eq!(config.memory.tile_bits(), 32);
/// assert!(!config.trace.enabled);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// General run settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Program decoding settings
    #[serde(default)]
    pub program: ProgramConfig,
    /// Memory geometry
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Waveform trace settings
    #[serde(default)]
    pub trace: TraceConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if the JSON is malformed or the geometry is invalid.
    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the configured widths can be expressed by the packing fold.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidInstructionWidth`] for a width that is not a positive multiple
    /// of 8, and [`SimError::Config`] for an element width outside `1..=64` or an empty tile.
    pub fn validate(&self) -> SimResult<()> {
        let bits = self.program.instruction_width;
        if bits == 0 || bits % 8 != 0 {
            return Err(SimError::InvalidInstructionWidth { bits });
        }
        if !(1..=64).contains(&self.memory.element_bits) {
            return Err(SimError::Config(format!(
                "element_bits must be in 1..=64, got {}",
                self.memory.element_bits
            )));
        }
        if self.memory.matrix_size == 0 {
            return Err(SimError::Config("matrix_size must be non-zero".into()));
        }
        if self.memory.host_addr_bits == 0 {
            return Err(SimError::Config("host_addr_bits must be non-zero".into()));
        }
        if self.general.max_cycles == Some(0) {
            return Err(SimError::Config("max_cycles must be non-zero".into()));
        }
        Ok(())
    }
}

/// General run settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GeneralConfig {
    /// Abort with `CycleLimitExceeded` after this many cycles without `halt`.
    ///
    /// `None` runs until the core halts, however long that takes.
    #[serde(default)]
    pub max_cycles: Option<u64>,
}

/// Program decoding settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgramConfig {
    /// Instruction word width in bits; must be a multiple of 8.
    #[serde(default = "ProgramConfig::default_instruction_width")]
    pub instruction_width: u32,
}

impl ProgramConfig {
    const fn default_instruction_width() -> u32 {
        defaults::INSTRUCTION_WIDTH
    }
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            instruction_width: defaults::INSTRUCTION_WIDTH,
        }
    }
}

/// Memory geometry shared by the host and weight images.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    /// Width of one packed element in bits.
    #[serde(default = "MemoryConfig::default_element_bits")]
    pub element_bits: u32,

    /// Elements per host vector and side length of a weight tile.
    #[serde(default = "MemoryConfig::default_matrix_size")]
    pub matrix_size: usize,

    /// Width of the host-memory address signals in bits.
    #[serde(default = "MemoryConfig::default_host_addr_bits")]
    pub host_addr_bits: u32,
}

impl MemoryConfig {
    const fn default_element_bits() -> u32 {
        defaults::ELEMENT_BITS
    }

    const fn default_matrix_size() -> usize {
        defaults::MATRIX_SIZE
    }

    const fn default_host_addr_bits() -> u32 {
        defaults::HOST_ADDR_BITS
    }

    /// Width of one packed host vector (`matrix_size * element_bits`).
    pub const fn vector_bits(&self) -> u32 {
        self.matrix_size as u32 * self.element_bits
    }

    /// Width of one packed weight tile (`matrix_size^2 * element_bits`).
    pub const fn tile_bits(&self) -> u32 {
        (self.matrix_size * self.matrix_size) as u32 * self.element_bits
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            element_bits: defaults::ELEMENT_BITS,
            matrix_size: defaults::MATRIX_SIZE,
            host_addr_bits: defaults::HOST_ADDR_BITS,
        }
    }
}

/// Waveform trace settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TraceConfig {
    /// Record the per-cycle signal history and export it on halt.
    #[serde(default = "TraceConfig::default_enabled")]
    pub enabled: bool,

    /// Output path of the value-change dump.
    #[serde(default = "TraceConfig::default_vcd_path")]
    pub vcd_path: String,

    /// Scope name wrapping the exported signals.
    #[serde(default = "TraceConfig::default_top_module")]
    pub top_module: String,
}

impl TraceConfig {
    const fn default_enabled() -> bool {
        true
    }

    fn default_vcd_path() -> String {
        defaults::VCD_PATH.to_string()
    }

    fn default_top_module() -> String {
        defaults::TOP_MODULE.to_string()
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vcd_path: defaults::VCD_PATH.to_string(),
            top_module: defaults::TOP_MODULE.to_string(),
        }
    }
}
