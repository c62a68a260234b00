//! Packed-cell codec.
//!
//! Converts between ordered sequences of fixed-width elements and the single wide integer
//! that represents them in a memory cell. It provides:
//! 1. **Vector packing:** `concat_vec` folds one row, element 0 in the most-significant group.
//! 2. **Tile packing:** `concat_tile` folds a square tile row-major, earlier rows more significant.
//! 3. **Unpacking:** `make_vec` and `split_tile` recover rows for memory dumps.
//!
//! Every element is masked to `bits` bits before it is folded in. Out-of-range and negative
//! values are truncated to their low two's complement bits, never rejected.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

use crate::common::constants::{ELEMENT_BITS, TILE_DECODE_SHIFT, VEC_DECODE_SHIFT};

/// Returns the `bits`-wide all-ones mask (`bits` in `1..=64`).
#[inline]
pub const fn element_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Packs a row of elements into one cell, element 0 in the most-significant group.
///
/// # Examples
///
/// ```
/// use num_bigint::BigUint;
/// use tpusim_core::memory::codec::concat_vec;
///
/// assert_eq!(concat_vec(&[1, 2], 8), BigUint::from(0x0102u32));
/// assert_eq!(concat_vec(&[-1, 0x1ff], 8), BigUint::from(0xffffu32));
/// ```
pub fn concat_vec(elements: &[i64], bits: u32) -> BigUint {
    let mask = element_mask(bits);
    elements.iter().fold(BigUint::zero(), |acc, &x| {
        (acc << bits) | BigUint::from(x as u64 & mask)
    })
}

/// Packs a 2-D tile into one cell, row-major with earlier rows more significant.
///
/// Rows are not checked for equal length; each is folded in as given.
pub fn concat_tile<R: AsRef<[i64]>>(tile: &[R], bits: u32) -> BigUint {
    let mask = element_mask(bits);
    tile.iter()
        .flat_map(|row| row.as_ref().iter())
        .fold(BigUint::zero(), |acc, &x| {
            (acc << bits) | BigUint::from(x as u64 & mask)
        })
}

/// Unpacks a vector cell, most-significant element first.
///
/// Each step masks `bits` bits and then shifts by a fixed 8 bits. Decoding stops when the
/// remaining value is zero, so leading zero elements are dropped and a zero cell decodes to
/// an empty vector.
pub fn make_vec(value: &BigUint, bits: u32) -> Vec<u64> {
    let mask = BigUint::from(element_mask(bits));
    let mut rest = value.clone();
    let mut out = Vec::new();
    while !rest.is_zero() {
        out.push((&rest & &mask).to_u64().unwrap_or_default());
        rest >>= VEC_DECODE_SHIFT;
    }
    out.reverse();
    out
}

/// Splits a tile cell into its rows, first row first.
///
/// Each step masks the low `size * bits` bits, decodes them with [`make_vec`] at the default
/// 8-bit element width and shifts by a fixed 64 bits. Rows only line up with the packed
/// elements when `bits == 8` and `size == 8`.
pub fn split_tile(value: &BigUint, bits: u32, size: usize) -> Vec<Vec<u64>> {
    let row_bits = size as u64 * u64::from(bits);
    let mask = (BigUint::one() << row_bits) - 1u32;
    let mut rest = value.clone();
    let mut rows = Vec::new();
    while !rest.is_zero() {
        rows.push(make_vec(&(&rest & &mask), ELEMENT_BITS));
        rest >>= TILE_DECODE_SHIFT;
    }
    rows.reverse();
    rows
}
