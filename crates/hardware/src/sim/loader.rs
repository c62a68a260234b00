//! Program and memory-array loading.
//!
//! This module prepares everything the driver needs before the first cycle. It performs:
//! 1. **Binary loading:** Reads the program file from disk into a byte buffer.
//! 2. **Instruction decoding:** Slices the byte stream into big-endian, fixed-width words.
//! 3. **Array loading:** Reads the host (2-D) and weight (3-D) `.npy` arrays and packs them
//!    into memory images.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use num_bigint::BigUint;

use crate::common::constants::BYTE_BITS;
use crate::common::error::{SimError, SimResult};
use crate::memory::MemoryImage;
use crate::sim::npy::read_npy;

/// Loads a binary file from disk into a byte vector.
///
/// # Errors
///
/// Returns [`SimError::Io`] naming the path if the file cannot be read.
pub fn load_binary(path: &Path) -> SimResult<Vec<u8>> {
    fs::read(path).map_err(|source| SimError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the instruction width in bytes for a width in bits.
///
/// # Errors
///
/// Returns [`SimError::InvalidInstructionWidth`] unless `word_bits` is a positive multiple
/// of 8.
pub fn word_bytes(word_bits: u32) -> SimResult<usize> {
    if word_bits == 0 || word_bits % BYTE_BITS != 0 {
        return Err(SimError::InvalidInstructionWidth { bits: word_bits });
    }
    Ok((word_bits / BYTE_BITS) as usize)
}

/// Decodes a byte stream into instruction words, most-significant byte first.
///
/// # Errors
///
/// Returns [`SimError::InvalidInstructionWidth`] for a bad width and
/// [`SimError::MalformedProgram`] if the stream ends in a partial word.
///
/// # Examples
///
/// ```
/// use num_bigint::BigUint;
/// use tpusim_core::sim::loader::decode_program;
///
/// let words = decode_program(&[0x00, 0x01, 0x00, 0x02], 16).unwrap();
/// assert_eq!(words, vec![BigUint::from(1u32), BigUint::from(2u32)]);
/// ```
pub fn decode_program(bytes: &[u8], word_bits: u32) -> SimResult<Vec<BigUint>> {
    let width = word_bytes(word_bits)?;
    if bytes.len() % width != 0 {
        return Err(SimError::MalformedProgram {
            len: bytes.len(),
            width,
        });
    }
    Ok(bytes.chunks_exact(width).map(BigUint::from_bytes_be).collect())
}

/// A decoded program: the instruction words in address order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    words: Vec<BigUint>,
    word_bits: u32,
}

impl Program {
    /// Decodes a program from raw bytes.
    ///
    /// # Errors
    ///
    /// See [`decode_program`].
    pub fn decode(bytes: &[u8], word_bits: u32) -> SimResult<Self> {
        Ok(Self {
            words: decode_program(bytes, word_bits)?,
            word_bits,
        })
    }

    /// Reads and decodes a program file.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Io`] if the file is unreadable, otherwise see [`decode_program`].
    pub fn from_file(path: &Path, word_bits: u32) -> SimResult<Self> {
        let bytes = load_binary(path)?;
        let program = Self::decode(&bytes, word_bits)?;
        tracing::debug!(
            path = %path.display(),
            words = program.len(),
            word_bits,
            "decoded program"
        );
        Ok(program)
    }

    /// Instruction words, address 0 first.
    pub fn words(&self) -> &[BigUint] {
        &self.words
    }

    /// Width of each word in bits.
    pub const fn word_bits(&self) -> u32 {
        self.word_bits
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` for an empty program.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Address-to-word map used to preload the engine's instruction memory.
    pub fn memory_map(&self) -> BTreeMap<u64, BigUint> {
        self.words
            .iter()
            .enumerate()
            .map(|(addr, word)| (addr as u64, word.clone()))
            .collect()
    }
}

/// Loads a 2-D host-memory array and packs one row per address.
///
/// # Errors
///
/// Returns [`SimError::Io`] or [`SimError::Npy`] if the file is unreadable or not 2-D.
pub fn load_host_memory(path: &Path, bits: u32) -> SimResult<MemoryImage> {
    let array = read_npy(path)?;
    tracing::debug!(path = %path.display(), shape = ?array.shape(), "loaded host array");
    Ok(MemoryImage::from_vectors(array.to_rows()?.as_slice(), bits))
}

/// Loads a 3-D weight array and packs one tile per address.
///
/// # Errors
///
/// Returns [`SimError::Io`] or [`SimError::Npy`] if the file is unreadable or not 3-D.
pub fn load_weight_memory(path: &Path, bits: u32) -> SimResult<MemoryImage> {
    let array = read_npy(path)?;
    tracing::debug!(path = %path.display(), shape = ?array.shape(), "loaded weight array");
    Ok(MemoryImage::from_tiles(array.to_tiles()?.as_slice(), bits))
}
