//! Packing and decoding functions exposed to Python.
//!
//! Thin wrappers over `tpusim_core::memory::codec` and the program decoder, with the same
//! defaults as the driver configuration (8-bit elements, 8x8 tiles, 112-bit instructions).

use num_bigint::BigUint;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use tpusim_core::memory::codec;
use tpusim_core::sim::loader;

use crate::conversion::sim_err;

fn check_bits(bits: u32) -> PyResult<()> {
    if (1..=64).contains(&bits) {
        Ok(())
    } else {
        Err(PyValueError::new_err(format!(
            "bits must be in 1..=64, got {bits}"
        )))
    }
}

/// Packs a row of elements into one integer, element 0 in the most-significant group.
#[pyfunction]
#[pyo3(signature = (elements, bits=8))]
pub fn concat_vec(elements: Vec<i64>, bits: u32) -> PyResult<BigUint> {
    check_bits(bits)?;
    Ok(codec::concat_vec(&elements, bits))
}

/// Packs a 2-D tile into one integer, row-major with earlier rows more significant.
#[pyfunction]
#[pyo3(signature = (tile, bits=8))]
pub fn concat_tile(tile: Vec<Vec<i64>>, bits: u32) -> PyResult<BigUint> {
    check_bits(bits)?;
    Ok(codec::concat_tile(tile.as_slice(), bits))
}

/// Unpacks a vector cell, most-significant element first (leading zeros dropped).
#[pyfunction]
#[pyo3(signature = (value, bits=8))]
pub fn make_vec(value: BigUint, bits: u32) -> PyResult<Vec<u64>> {
    check_bits(bits)?;
    Ok(codec::make_vec(&value, bits))
}

/// Splits a tile cell into its rows, first row first.
#[pyfunction]
#[pyo3(signature = (value, bits=8, size=8))]
pub fn split_tile(value: BigUint, bits: u32, size: usize) -> PyResult<Vec<Vec<u64>>> {
    check_bits(bits)?;
    Ok(codec::split_tile(&value, bits, size))
}

/// Decodes a program byte stream into big-endian instruction words.
///
/// Raises `ValueError` if the width is not a multiple of 8 or the stream ends mid-word.
#[pyfunction]
#[pyo3(signature = (data, width=112))]
pub fn decode_program(data: Vec<u8>, width: u32) -> PyResult<Vec<BigUint>> {
    loader::decode_program(&data, width).map_err(sim_err)
}
