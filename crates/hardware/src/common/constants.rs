//! Constants shared by the codec, loader, and driver.

/// Bits per packed element when no width is configured.
pub const ELEMENT_BITS: u32 = 8;

/// Right-shift applied per step when unpacking a vector cell.
///
/// Fixed at 8 regardless of the element width, matching the packing step of the default
/// configuration.
pub const VEC_DECODE_SHIFT: u32 = 8;

/// Right-shift applied per step when splitting a tile cell into rows.
///
/// Fixed at `8 * 8`; it only matches the packed row width when `bits == 8` and `size == 8`.
pub const TILE_DECODE_SHIFT: u32 = 8 * 8;

/// Bits per byte of the program stream.
pub const BYTE_BITS: u32 = 8;

/// Instruction memory name used for the engine preload.
pub const IMEM: &str = "IMem";
