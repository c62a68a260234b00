//! NumPy `.npy` array reader.
//!
//! Host and weight memory contents are supplied as NumPy arrays. This module parses the
//! `.npy` v1/v2/v3 container for integer and boolean dtypes in either byte order, widening
//! every element to `i64`. Only C-ordered arrays are accepted.
//!
//! Reference: <https://numpy.org/devdocs/reference/generated/numpy.lib.format.html>

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::common::error::{NpyError, SimError, SimResult};

const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// A dense, C-ordered integer array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<i64>,
}

impl NdArray {
    /// Creates an array, checking that `data` fills `shape` exactly.
    ///
    /// # Errors
    ///
    /// Returns [`NpyError::PayloadSize`] (in elements) if the lengths disagree, or
    /// [`NpyError::MalformedHeader`] if the element count of `shape` overflows.
    pub fn new(shape: Vec<usize>, data: Vec<i64>) -> Result<Self, NpyError> {
        let expected = element_count(&shape)?;
        if expected != data.len() {
            return Err(NpyError::PayloadSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Array dimensions, outermost first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Elements in C order.
    pub fn data(&self) -> &[i64] {
        &self.data
    }

    /// Splits a 2-D array into its rows.
    ///
    /// # Errors
    ///
    /// Returns [`NpyError::Dimensions`] unless the array is 2-D.
    pub fn to_rows(&self) -> Result<Vec<Vec<i64>>, NpyError> {
        self.expect_ndim(2)?;
        Ok(split_rows(&self.data, self.shape[0], self.shape[1]))
    }

    /// Splits a 3-D array into tiles of rows.
    ///
    /// # Errors
    ///
    /// Returns [`NpyError::Dimensions`] unless the array is 3-D.
    pub fn to_tiles(&self) -> Result<Vec<Vec<Vec<i64>>>, NpyError> {
        self.expect_ndim(3)?;
        let (tiles, rows, cols) = (self.shape[0], self.shape[1], self.shape[2]);
        let rows = split_rows(&self.data, tiles, rows * cols)
            .into_iter()
            .map(|tile| split_rows(&tile, rows, cols))
            .collect();
        Ok(rows)
    }

    fn expect_ndim(&self, expected: usize) -> Result<(), NpyError> {
        if self.ndim() == expected {
            Ok(())
        } else {
            Err(NpyError::Dimensions {
                expected,
                actual: self.ndim(),
            })
        }
    }
}

fn split_rows(data: &[i64], rows: usize, cols: usize) -> Vec<Vec<i64>> {
    if cols == 0 {
        return vec![Vec::new(); rows];
    }
    data.chunks(cols).map(<[i64]>::to_vec).collect()
}

/// Parsed `descr` entry of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dtype {
    kind: char,
    size: usize,
    big_endian: bool,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, NpyError> {
        let unsupported = || NpyError::UnsupportedDtype(descr.to_string());
        let mut chars = descr.chars();
        let (big_endian, rest) = match chars.next() {
            Some('<' | '|' | '=') => (false, chars.as_str()),
            Some('>') => (true, chars.as_str()),
            _ => return Err(unsupported()),
        };
        let mut rest_chars = rest.chars();
        let kind = rest_chars.next().ok_or_else(unsupported)?;
        let size: usize = rest_chars.as_str().parse().map_err(|_| unsupported())?;
        let valid = match kind {
            'b' => size == 1,
            'i' | 'u' => matches!(size, 1 | 2 | 4 | 8),
            _ => false,
        };
        if !valid {
            return Err(unsupported());
        }
        Ok(Self {
            kind,
            size,
            big_endian,
        })
    }

    fn decode(self, bytes: &[u8]) -> i64 {
        let mut buf = [0u8; 8];
        if self.big_endian {
            buf[8 - self.size..].copy_from_slice(bytes);
        } else {
            buf[..self.size].copy_from_slice(bytes);
        }
        let raw = if self.big_endian {
            u64::from_be_bytes(buf)
        } else {
            u64::from_le_bytes(buf)
        };
        match self.kind {
            'i' => {
                // Sign-extend from the element width.
                let shift = 64 - 8 * self.size as u32;
                ((raw << shift) as i64) >> shift
            }
            'b' => i64::from(raw != 0),
            _ => raw as i64,
        }
    }
}

/// Header fields needed to decode the payload.
#[derive(Debug)]
struct Header {
    dtype: Dtype,
    shape: Vec<usize>,
}

fn header_value<'a>(header: &'a str, key: &str) -> Result<&'a str, NpyError> {
    let start = header
        .find(&format!("'{key}'"))
        .or_else(|| header.find(&format!("\"{key}\"")))
        .ok_or_else(|| NpyError::MalformedHeader(format!("no '{key}' key")))?;
    let after_key = &header[start + key.len() + 2..];
    let colon = after_key
        .find(':')
        .ok_or_else(|| NpyError::MalformedHeader(format!("no value for '{key}'")))?;
    Ok(after_key[colon + 1..].trim_start())
}

fn parse_header(header: &str) -> Result<Header, NpyError> {
    let descr = header_value(header, "descr")?;
    let quote = descr
        .chars()
        .next()
        .filter(|c| *c == '\'' || *c == '"')
        .ok_or_else(|| NpyError::MalformedHeader("descr is not a string".into()))?;
    let descr = &descr[1..];
    let end = descr
        .find(quote)
        .ok_or_else(|| NpyError::MalformedHeader("unterminated descr".into()))?;
    let dtype = Dtype::parse(&descr[..end])?;

    if header_value(header, "fortran_order")?.starts_with("True") {
        return Err(NpyError::FortranOrder);
    }

    let shape = header_value(header, "shape")?;
    let open = shape
        .find('(')
        .ok_or_else(|| NpyError::MalformedHeader("no opening paren in shape".into()))?;
    let close = shape
        .find(')')
        .ok_or_else(|| NpyError::MalformedHeader("no closing paren in shape".into()))?;
    let shape = shape[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|e| NpyError::MalformedHeader(format!("bad shape dim '{s}': {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Header { dtype, shape })
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<(), NpyError> {
    reader
        .read_exact(buf)
        .map_err(|e| NpyError::MalformedHeader(format!("failed to read {what}: {e}")))
}

/// Parses a `.npy` stream into an [`NdArray`].
///
/// # Errors
///
/// Returns an [`NpyError`] describing the first problem found in the container.
pub fn parse_npy<R: Read>(mut reader: R) -> Result<NdArray, NpyError> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic).map_err(|_| NpyError::BadMagic)?;
    if &magic != MAGIC {
        return Err(NpyError::BadMagic);
    }

    let mut version = [0u8; 2];
    read_exact(&mut reader, &mut version, "version")?;
    let header_len = match version[0] {
        1 => {
            let mut buf = [0u8; 2];
            read_exact(&mut reader, &mut buf, "header length")?;
            u16::from_le_bytes(buf) as usize
        }
        2 | 3 => {
            let mut buf = [0u8; 4];
            read_exact(&mut reader, &mut buf, "header length")?;
            u32::from_le_bytes(buf) as usize
        }
        major => return Err(NpyError::UnsupportedVersion(major, version[1])),
    };

    let mut header = vec![0u8; header_len];
    read_exact(&mut reader, &mut header, "header")?;
    let header = std::str::from_utf8(&header)
        .map_err(|e| NpyError::MalformedHeader(format!("header is not utf8: {e}")))?;
    let Header { dtype, shape } = parse_header(header)?;

    let expected = element_count(&shape)?
        .checked_mul(dtype.size)
        .ok_or_else(|| NpyError::MalformedHeader(format!("shape {shape:?} overflows")))?;
    // Sized by what is actually read, never by the header.
    let mut payload = Vec::new();
    let _ = reader
        .read_to_end(&mut payload)
        .map_err(|e| NpyError::MalformedHeader(format!("failed to read payload: {e}")))?;
    if payload.len() != expected {
        return Err(NpyError::PayloadSize {
            expected,
            actual: payload.len(),
        });
    }

    let data = payload
        .chunks_exact(dtype.size)
        .map(|bytes| dtype.decode(bytes))
        .collect();
    NdArray::new(shape, data)
}

/// Reads a `.npy` file from disk.
///
/// # Errors
///
/// Returns [`SimError::Io`] if the file cannot be opened and [`SimError::Npy`] if it cannot be
/// decoded.
pub fn read_npy(path: &Path) -> SimResult<NdArray> {
    let file = File::open(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_npy(BufReader::new(file))?)
}

fn element_count(shape: &[usize]) -> Result<usize, NpyError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or_else(|| NpyError::MalformedHeader(format!("shape {shape:?} overflows")))
}
