//! Primitive encodings: coded index widths, method headers, compressed integers.

use dotlayout::{
    file::parser::read_compressed_uint,
    metadata::{method::MethodHeader, tables::coded_index_size},
    ByteBuffer, Error,
};

#[test]
fn coded_index_width() {
    // two target tables, two tag bits
    assert_eq!(coded_index_size(2, [16383, 10]), 2);
    assert_eq!(coded_index_size(2, [16384, 10]), 4);
    assert_eq!(coded_index_size(2, [10, 65536]), 4);
    assert_eq!(coded_index_size(2, [0, 0]), 2);
    assert_eq!(coded_index_size(5, [2047]), 2);
    assert_eq!(coded_index_size(5, [2048]), 4);
}

#[test]
fn tiny_method_header() {
    let buffer = ByteBuffer::from_mem(vec![0b0000_0110, 0x2A]);
    let header = MethodHeader::read(&buffer, 0).unwrap();

    assert!(!header.is_fat);
    assert_eq!(header.header_size, 1);
    assert_eq!(header.code_size, 1);
    assert_eq!(header.size(), 2);
}

#[test]
fn fat_method_header() {
    #[rustfmt::skip]
    let buffer = ByteBuffer::from_mem(vec![
        0x13, 0x30, 0x02, 0x00,
        0x02, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x00, 0x2A,
    ]);
    let header = MethodHeader::read(&buffer, 0).unwrap();

    assert!(header.is_fat);
    assert_eq!(header.header_size, 12);
    assert_eq!(header.max_stack, 2);
    assert_eq!(header.code_size, 2);
    assert_eq!(header.size(), 14);
}

#[test]
fn truncated_method_body() {
    let buffer = ByteBuffer::from_mem(vec![0b0001_0010, 0x00]);
    assert!(matches!(
        MethodHeader::read(&buffer, 0),
        Err(Error::TruncatedBuffer { .. })
    ));
}

#[test]
fn compressed_integers() {
    assert_eq!(read_compressed_uint(&[0x05]).unwrap(), (5, 1));
    assert_eq!(read_compressed_uint(&[0x80, 0x80]).unwrap(), (128, 2));
    assert_eq!(read_compressed_uint(&[0xBF, 0xFF]).unwrap(), (0x3FFF, 2));
    assert_eq!(
        read_compressed_uint(&[0xC0, 0x00, 0x40, 0x00]).unwrap(),
        (0x4000, 4)
    );
    assert!(read_compressed_uint(&[0xC0, 0x00]).is_err());
}
