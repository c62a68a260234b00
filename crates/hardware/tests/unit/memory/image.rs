//! # Memory Image Tests
//!
//! Sparse storage, overwrite semantics, and address-ordered dumps.

use num_bigint::BigUint;
use pretty_assertions::assert_eq;
use tpusim_core::memory::MemoryImage;
use tpusim_core::memory::codec::concat_vec;

#[test]
fn from_vectors_places_row_i_at_address_i() {
    let image = MemoryImage::from_vectors(&[vec![1i64, 2], vec![3, 4]], 8);
    assert_eq!(image.len(), 2);
    assert_eq!(image.get(0), Some(&BigUint::from(0x0102u32)));
    assert_eq!(image.get(1), Some(&BigUint::from(0x0304u32)));
    assert_eq!(image.get(2), None);
}

#[test]
fn from_tiles_packs_each_tile() {
    let tiles = vec![vec![vec![5i64, 6], vec![7, 8]], vec![vec![1, 1], vec![1, 1]]];
    let image = MemoryImage::from_tiles(tiles.as_slice(), 8);
    assert_eq!(image.get(0), Some(&BigUint::from(0x0506_0708u32)));
    assert_eq!(image.get(1), Some(&BigUint::from(0x0101_0101u32)));
    assert_eq!(image.max_address(), Some(1));
}

#[test]
fn write_creates_and_overwrites() {
    let mut image = MemoryImage::new();
    assert!(image.is_empty());
    assert_eq!(image.write(7, BigUint::from(1u32)), None);
    assert!(image.contains(7));
    assert_eq!(image.write(7, BigUint::from(2u32)), Some(BigUint::from(1u32)));
    assert_eq!(image.get(7), Some(&BigUint::from(2u32)));
    assert_eq!(image.len(), 1);
}

#[test]
fn iteration_is_address_ordered() {
    let mut image = MemoryImage::new();
    let _ = image.write(9, BigUint::from(3u32));
    let _ = image.write(2, BigUint::from(1u32));
    let _ = image.write(5, BigUint::from(2u32));
    let addrs: Vec<u64> = image.iter().map(|(addr, _)| addr).collect();
    assert_eq!(addrs, vec![2, 5, 9]);
    assert_eq!(image.max_address(), Some(9));
}

#[test]
fn empty_image_has_no_max_address() {
    assert_eq!(MemoryImage::new().max_address(), None);
    assert_eq!(MemoryImage::new().render_vectors(8), "");
}

#[test]
fn render_vectors_lists_address_and_elements() {
    let image = MemoryImage::from_vectors(&[vec![1i64, 2], vec![3, 4]], 8);
    assert_eq!(image.render_vectors(8), "0 [1, 2]\n1 [3, 4]\n");
}

#[test]
fn render_vectors_shows_zero_cell_as_empty() {
    let image = MemoryImage::from_vectors(&[vec![0i64, 0], vec![0, 9]], 8);
    assert_eq!(image.render_vectors(8), "0 []\n1 [9]\n");
}

#[test]
fn tile_dump_recovers_default_geometry() {
    let tile: Vec<Vec<i64>> = (0..8).map(|r| vec![r + 1; 8]).collect();
    let image = MemoryImage::from_tiles(&[tile], 8);
    let dump = image.tile_dump(8, 8);
    assert_eq!(dump.len(), 1);
    assert_eq!(dump[0].0, 0);
    let expected: Vec<Vec<u64>> = (1..=8).map(|r| vec![r; 8]).collect();
    assert_eq!(dump[0].1, expected);
}

#[test]
fn to_map_matches_cells() {
    let image: MemoryImage = [(3u64, concat_vec(&[4], 8))].into_iter().collect();
    let map = image.to_map();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&3), Some(&BigUint::from(4u32)));
}
