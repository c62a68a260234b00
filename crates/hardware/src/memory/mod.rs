//! External memory images.
//!
//! This module implements the memories the driver emulates around the core. It provides:
//! 1. **Codec:** Packing and unpacking of vector and tile cells.
//! 2. **Image:** A sparse address-to-cell map with insert-or-overwrite writes.
//! 3. **Dumps:** Address-ordered unpacked listings of host and weight memory.

/// Packed-cell encode/decode functions.
pub mod codec;

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use num_bigint::BigUint;

use self::codec::{concat_tile, concat_vec, make_vec, split_tile};

/// Sparse memory image mapping addresses to packed cells.
///
/// Host memory holds one packed vector per address; weight memory holds one packed tile per
/// address. Lookups of absent addresses return `None`; the caller decides the miss policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryImage {
    cells: BTreeMap<u64, BigUint>,
}

impl MemoryImage {
    /// Creates an empty image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a host-memory image: row `i` is packed with `concat_vec` at address `i`.
    pub fn from_vectors<R: AsRef<[i64]>>(rows: &[R], bits: u32) -> Self {
        let cells = rows
            .iter()
            .enumerate()
            .map(|(addr, row)| (addr as u64, concat_vec(row.as_ref(), bits)))
            .collect();
        Self { cells }
    }

    /// Builds a weight-memory image: tile `i` is packed with `concat_tile` at address `i`.
    pub fn from_tiles<R: AsRef<[i64]>>(tiles: &[Vec<R>], bits: u32) -> Self {
        let cells = tiles
            .iter()
            .enumerate()
            .map(|(addr, tile)| (addr as u64, concat_tile(tile, bits)))
            .collect();
        Self { cells }
    }

    /// Returns the cell at `addr`, if populated.
    #[inline]
    pub fn get(&self, addr: u64) -> Option<&BigUint> {
        self.cells.get(&addr)
    }

    /// Stores `value` at `addr`, creating or overwriting the cell.
    ///
    /// Returns the previous value, if any.
    pub fn write(&mut self, addr: u64, value: BigUint) -> Option<BigUint> {
        self.cells.insert(addr, value)
    }

    /// Returns `true` if `addr` is populated.
    pub fn contains(&self, addr: u64) -> bool {
        self.cells.contains_key(&addr)
    }

    /// Number of populated cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if no cell is populated.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Highest populated address.
    pub fn max_address(&self) -> Option<u64> {
        self.cells.keys().next_back().copied()
    }

    /// Iterates populated cells in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &BigUint)> + '_ {
        self.cells.iter().map(|(&addr, value)| (addr, value))
    }

    /// Copies the image into an address-to-value map (the engine preload shape).
    pub fn to_map(&self) -> BTreeMap<u64, BigUint> {
        self.cells.clone()
    }

    /// Unpacks every cell as a vector, in address order.
    pub fn vector_dump(&self, bits: u32) -> Vec<(u64, Vec<u64>)> {
        self.iter()
            .map(|(addr, value)| (addr, make_vec(value, bits)))
            .collect()
    }

    /// Unpacks every cell as a tile of rows, in address order.
    pub fn tile_dump(&self, bits: u32, size: usize) -> Vec<(u64, Vec<Vec<u64>>)> {
        self.iter()
            .map(|(addr, value)| (addr, split_tile(value, bits, size)))
            .collect()
    }

    /// Renders the vector dump, one `"{addr} {vector:?}"` line per cell.
    pub fn render_vectors(&self, bits: u32) -> String {
        render_lines(self.vector_dump(bits))
    }

    /// Renders the tile dump, one `"{index} {rows:?}"` line per tile.
    pub fn render_tiles(&self, bits: u32, size: usize) -> String {
        render_lines(self.tile_dump(bits, size))
    }
}

fn render_lines<T: fmt::Debug>(entries: Vec<(u64, T)>) -> String {
    let mut out = String::new();
    for (addr, value) in entries {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{addr} {value:?}");
    }
    out
}

impl FromIterator<(u64, BigUint)> for MemoryImage {
    fn from_iter<I: IntoIterator<Item = (u64, BigUint)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}
