//! # NumPy Reader Tests
//!
//! Header parsing, dtype decoding, and container validation.

use std::path::Path;

use rstest::rstest;
use tpusim_core::common::{NpyError, SimError};
use tpusim_core::sim::npy::{NdArray, parse_npy, read_npy};

use crate::common::builder::npy::{build_i64_npy, build_npy, temp_file};

#[test]
fn parses_int64_matrix() {
    let bytes = build_i64_npy(&[2, 3], &[1, -2, 3, 4, 5, -6]);
    let array = parse_npy(bytes.as_slice()).unwrap();
    assert_eq!(array.shape(), &[2usize, 3]);
    assert_eq!(array.ndim(), 2);
    assert_eq!(array.data(), &[1i64, -2, 3, 4, 5, -6]);
    assert_eq!(array.to_rows().unwrap(), vec![vec![1i64, -2, 3], vec![4, 5, -6]]);
}

#[rstest]
#[case("<i1", vec![0xff, 0x7f], vec![-1, 127])]
#[case("|u1", vec![0xff, 0x01], vec![255, 1])]
#[case("<i2", vec![0xfe, 0xff, 0x02, 0x01], vec![-2, 0x0102])]
#[case(">i2", vec![0xff, 0xfe, 0x01, 0x02], vec![-2, 0x0102])]
#[case("<u2", vec![0xff, 0xff, 0x00, 0x00], vec![0xffff, 0])]
#[case("<i4", vec![0xff, 0xff, 0xff, 0xff, 0x01, 0, 0, 0], vec![-1, 1])]
#[case(">u4", vec![0, 0, 0x01, 0x00, 0, 0, 0, 0x05], vec![256, 5])]
#[case("|b1", vec![0x00, 0x01], vec![0, 1])]
fn decodes_supported_dtypes(
    #[case] descr: &str,
    #[case] payload: Vec<u8>,
    #[case] expected: Vec<i64>,
) {
    let bytes = build_npy(1, descr, &[2], &payload);
    let array = parse_npy(bytes.as_slice()).unwrap();
    assert_eq!(array.data(), expected.as_slice());
}

#[rstest]
#[case(2)]
#[case(3)]
fn accepts_wide_header_versions(#[case] version: u8) {
    let payload: Vec<u8> = [7i64, 8].iter().flat_map(|x| x.to_le_bytes()).collect();
    let bytes = build_npy(version, "<i8", &[1, 2], &payload);
    let array = parse_npy(bytes.as_slice()).unwrap();
    assert_eq!(array.data(), &[7i64, 8]);
}

#[test]
fn parses_three_dimensional_tiles() {
    let bytes = build_i64_npy(&[2, 2, 2], &[1, 2, 3, 4, 5, 6, 7, 8]);
    let tiles = parse_npy(bytes.as_slice()).unwrap().to_tiles().unwrap();
    assert_eq!(
        tiles,
        vec![vec![vec![1i64, 2], vec![3, 4]], vec![vec![5, 6], vec![7, 8]]]
    );
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = build_i64_npy(&[1], &[1]);
    bytes[1] = b'X';
    assert_eq!(parse_npy(bytes.as_slice()).unwrap_err(), NpyError::BadMagic);
}

#[test]
fn rejects_unknown_version() {
    let mut bytes = build_i64_npy(&[1], &[1]);
    bytes[6] = 9;
    assert_eq!(
        parse_npy(bytes.as_slice()).unwrap_err(),
        NpyError::UnsupportedVersion(9, 0)
    );
}

#[rstest]
#[case("<f8")]
#[case("<i3")]
#[case("<U4")]
#[case("O")]
fn rejects_unsupported_dtypes(#[case] descr: &str) {
    let bytes = build_npy(1, descr, &[1], &[0; 8]);
    assert_eq!(
        parse_npy(bytes.as_slice()).unwrap_err(),
        NpyError::UnsupportedDtype(descr.to_string())
    );
}

#[test]
fn rejects_fortran_order() {
    let header = "{'descr': '<i8', 'fortran_order': True, 'shape': (1,), }";
    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(&[0; 8]);
    assert_eq!(parse_npy(bytes.as_slice()).unwrap_err(), NpyError::FortranOrder);
}

#[test]
fn rejects_short_payload() {
    let mut bytes = build_i64_npy(&[2], &[1, 2]);
    bytes.truncate(bytes.len() - 3);
    assert_eq!(
        parse_npy(bytes.as_slice()).unwrap_err(),
        NpyError::PayloadSize {
            expected: 16,
            actual: 13
        }
    );
}

#[rstest]
#[case(&[1 << 40, 1 << 40])]
#[case(&[usize::MAX, 2])]
#[case(&[1 << 62])]
fn rejects_overflowing_shape(#[case] shape: &[usize]) {
    let bytes = build_npy(1, "<i8", shape, &[]);
    assert!(matches!(
        parse_npy(bytes.as_slice()).unwrap_err(),
        NpyError::MalformedHeader(_)
    ));
}

#[test]
fn huge_shape_with_short_payload_is_rejected() {
    let bytes = build_npy(1, "|u1", &[1 << 40], &[0; 4]);
    assert_eq!(
        parse_npy(bytes.as_slice()).unwrap_err(),
        NpyError::PayloadSize {
            expected: 1 << 40,
            actual: 4
        }
    );
}

#[test]
fn rejects_missing_shape_key() {
    let header = "{'descr': '<i8', 'fortran_order': False}";
    let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
    bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
    bytes.extend_from_slice(header.as_bytes());
    assert!(matches!(
        parse_npy(bytes.as_slice()).unwrap_err(),
        NpyError::MalformedHeader(_)
    ));
}

#[test]
fn wrong_dimensionality_for_role() {
    let array = NdArray::new(vec![4], vec![1, 2, 3, 4]).unwrap();
    assert_eq!(
        array.to_rows().unwrap_err(),
        NpyError::Dimensions {
            expected: 2,
            actual: 1
        }
    );
    assert_eq!(
        array.to_tiles().unwrap_err(),
        NpyError::Dimensions {
            expected: 3,
            actual: 1
        }
    );
}

#[test]
fn ndarray_checks_element_count() {
    assert!(NdArray::new(vec![2, 2], vec![1, 2, 3]).is_err());
    assert!(matches!(
        NdArray::new(vec![usize::MAX, 3], vec![]).unwrap_err(),
        NpyError::MalformedHeader(_)
    ));
}

#[test]
fn read_npy_from_disk() {
    let file = temp_file(&build_i64_npy(&[1, 1], &[42]));
    assert_eq!(read_npy(file.path()).unwrap().data(), &[42i64]);
}

#[test]
fn read_npy_missing_file() {
    let err = read_npy(Path::new("/nonexistent/hostmem.npy")).unwrap_err();
    assert!(matches!(err, SimError::Io { .. }));
}
