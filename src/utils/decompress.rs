//! Deflate decompression for embedded portable PDBs.
//!
//! The compiler stores embedded PDBs as a raw deflate stream (no zlib or gzip framing), the
//! format produced by `System.IO.Compression.DeflateStream`.

use std::io::Read;

use flate2::read::DeflateDecoder;

use crate::{Error::Decompression, Result};

/// Inflates a raw deflate stream that is expected to produce exactly `expected` bytes.
///
/// At most `limit` bytes are inflated; a stream claiming or producing more is rejected.
///
/// # Arguments
///
/// * `data` - The compressed payload.
/// * `expected` - The decompressed size recorded in front of the payload.
/// * `limit` - Upper bound for the decompressed size.
/// * `offset` - Absolute offset of the payload, for error reporting.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if `expected` exceeds `limit`, and
/// [`crate::Error::Decompression`] if the stream is corrupt or its size differs from
/// `expected`.
pub fn decompress_deflate(
    data: &[u8],
    expected: usize,
    limit: usize,
    offset: usize,
) -> Result<Vec<u8>> {
    if expected > limit {
        return Err(malformed_error!(
            "Embedded PDB at {:#x} declares {} bytes, limit is {}",
            offset,
            expected,
            limit
        ));
    }

    let mut decompressed = Vec::with_capacity(expected);
    DeflateDecoder::new(data)
        .take(expected as u64 + 1)
        .read_to_end(&mut decompressed)
        .map_err(|e| Decompression {
            offset,
            message: e.to_string(),
        })?;

    if decompressed.len() != expected {
        return Err(Decompression {
            offset,
            message: format!(
                "inflated {} bytes, expected {}",
                decompressed.len(),
                expected
            ),
        });
    }

    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::{write::DeflateEncoder, Compression};

    use super::*;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decompress_deflate() {
        let original = b"BSJB portable pdb payload, portable pdb payload";
        let compressed = compress(original);

        let decompressed =
            decompress_deflate(&compressed, original.len(), 1024, 0x200).unwrap();
        assert_eq!(&decompressed, original);
    }

    #[test]
    fn test_size_mismatch() {
        let compressed = compress(b"0123456789");

        assert!(matches!(
            decompress_deflate(&compressed, 4, 1024, 0x200),
            Err(Decompression { offset: 0x200, .. })
        ));
        assert!(matches!(
            decompress_deflate(&compressed, 20, 1024, 0x200),
            Err(Decompression { .. })
        ));
    }

    #[test]
    fn test_limit() {
        let compressed = compress(b"0123456789");

        assert!(matches!(
            decompress_deflate(&compressed, 10, 8, 0),
            Err(crate::Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_corrupt() {
        assert!(decompress_deflate(&[0xFF, 0xFF, 0xFF], 10, 1024, 0).is_err());
    }
}
