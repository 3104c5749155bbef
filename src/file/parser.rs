//! Cursor-based reader for sequentially encoded structures.
//!
//! Most decoders in this crate work on absolute offsets through the [`crate::file::ByteBuffer`],
//! but several payloads are sequential streams whose field boundaries are only known while
//! reading: blob signatures, custom debug information records, exception handling sections and
//! the key/value lists of compilation options. [`crate::file::parser::Parser`] covers those.
//!
//! Creating a parser over [`crate::file::ByteBuffer::data`] and seeking to an absolute offset
//! keeps every position (and every error offset) absolute.
//!
//! # Compressed Integers
//!
//! ECMA-335 II.23.2 encodes unsigned integers in 1, 2 or 4 bytes, selected by the high bits of
//! the first byte:
//!
//! | First byte | Length | Value |
//! |------------|--------|-------|
//! | `0xxxxxxx` | 1 | `b0` |
//! | `10xxxxxx` | 2 | `(b0 & 0x3F) << 8 \| b1` |
//! | `11xxxxxx` | 4 | `(b0 & 0x3F) << 24 \| b1 << 16 \| b2 << 8 \| b3` |
//!
//! # Examples
//!
//! ```rust
//! use dotlayout::file::parser::Parser;
//!
//! let data = [0x05, 0x80, 0x80, 0x41, 0x42, 0x00];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_compressed_uint()?, 5);
//! assert_eq!(parser.read_compressed_uint()?, 128);
//! assert_eq!(parser.read_string_utf8()?, "AB");
//! assert!(!parser.has_more_data());
//! # Ok::<(), dotlayout::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    Error::TruncatedBuffer,
    Result,
};

/// Decodes a compressed unsigned integer from the start of `data`.
///
/// Returns the value together with the number of bytes the encoding occupies (1, 2 or 4).
///
/// # Errors
/// Returns [`crate::Error::TruncatedBuffer`] if `data` ends before the encoding does.
pub fn read_compressed_uint(data: &[u8]) -> Result<(u32, usize)> {
    let mut parser = Parser::new(data);
    let value = parser.read_compressed_uint()?;
    Ok((value, parser.pos()))
}

/// Returns the encoded length (1, 2 or 4) of a compressed unsigned integer from its first byte.
#[must_use]
pub fn compressed_uint_len(first_byte: u8) -> usize {
    if first_byte & 0x80 == 0 {
        1
    } else if first_byte & 0xC0 == 0x80 {
        2
    } else {
        4
    }
}

/// A bounds-checked cursor over a byte slice.
pub struct Parser<'a> {
    /// The binary data being parsed
    data: &'a [u8],
    /// Current position within the data buffer
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new [`crate::file::parser::Parser`] from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Returns the length of the underlying data buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the parser has no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if there is more data available to parse.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of bytes between the cursor and the end of the data.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Get the current position of the parser within the data buffer.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Get access to the underlying data buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn truncated(&self, length: usize) -> crate::Error {
        TruncatedBuffer {
            offset: self.position,
            length,
            available: self.data.len(),
        }
    }

    /// Move the current position to the specified index. Seeking to the very end is allowed.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if `pos` is beyond the data length.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(TruncatedBuffer {
                offset: pos,
                length: 0,
                available: self.data.len(),
            });
        }

        self.position = pos;
        Ok(())
    }

    /// Move the position forward by the specified number of bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if advancing would exceed the data length.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if step > self.remaining() {
            return Err(self.truncated(step));
        }

        self.position += step;
        Ok(())
    }

    /// Align the position to a specific boundary (a power of two).
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if aligning would exceed the data length.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        let padding = (alignment - (self.position % alignment)) % alignment;
        self.advance_by(padding)
    }

    /// Peek at the next byte without advancing the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if position is at or beyond the data length.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| self.truncated(1))
    }

    /// Read a type `T` from the current position in little-endian format and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if reading would exceed the data length.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Read `len` raw bytes and advance the position.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(self.truncated(len));
        }

        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Read a compressed unsigned integer as defined in ECMA-335 II.23.2.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the encoding extends past the data.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.peek_byte()?;
        let length = compressed_uint_len(first_byte);
        if length > self.remaining() {
            return Err(self.truncated(length));
        }

        let bytes = self.read_bytes(length)?;
        let value = match bytes {
            [b0] => u32::from(*b0),
            [b0, b1] => ((u32::from(*b0) & 0x3F) << 8) | u32::from(*b1),
            [b0, b1, b2, b3] => {
                ((u32::from(*b0) & 0x3F) << 24)
                    | (u32::from(*b1) << 16)
                    | (u32::from(*b2) << 8)
                    | u32::from(*b3)
            }
            _ => unreachable!("compressed integers are 1, 2 or 4 bytes"),
        };

        Ok(value)
    }

    /// Read a zero-terminated UTF-8 string. The terminator is consumed but not returned; a
    /// string running to the end of the data is accepted without one.
    ///
    /// Invalid UTF-8 sequences are replaced, as this crate renders strings for display only.
    pub fn read_string_utf8(&mut self) -> Result<String> {
        let start = self.position;
        let rest = &self.data[start.min(self.data.len())..];
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());

        let value = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.position = start + end + usize::from(end < rest.len());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compressed_uint_one_byte() {
        assert_eq!(read_compressed_uint(&[0x05]).unwrap(), (5, 1));
        assert_eq!(read_compressed_uint(&[0x7F]).unwrap(), (0x7F, 1));
    }

    #[test]
    fn compressed_uint_two_bytes() {
        assert_eq!(read_compressed_uint(&[0x80, 0x80]).unwrap(), (128, 2));
        assert_eq!(read_compressed_uint(&[0xBF, 0xFF]).unwrap(), (0x3FFF, 2));
    }

    #[test]
    fn compressed_uint_four_bytes() {
        assert_eq!(
            read_compressed_uint(&[0xC0, 0x00, 0x40, 0x00]).unwrap(),
            (0x4000, 4)
        );
        assert_eq!(
            read_compressed_uint(&[0xDF, 0xFF, 0xFF, 0xFF]).unwrap(),
            (0x1FFF_FFFF, 4)
        );
    }

    #[test]
    fn compressed_uint_truncated() {
        assert!(matches!(
            read_compressed_uint(&[0x80]),
            Err(TruncatedBuffer { length: 2, .. })
        ));
        assert!(matches!(
            read_compressed_uint(&[0xC0, 0x00]),
            Err(TruncatedBuffer { length: 4, .. })
        ));
        assert!(read_compressed_uint(&[]).is_err());
    }

    #[test]
    fn navigation() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_le::<u8>().unwrap(), 0x01);
        parser.align(4).unwrap();
        assert_eq!(parser.pos(), 4);
        assert_eq!(parser.read_le::<u16>().unwrap(), 0x0605);
        assert_eq!(parser.remaining(), 2);
        assert!(parser.advance_by(3).is_err());
        parser.seek(8).unwrap();
        assert!(!parser.has_more_data());
        assert!(parser.seek(9).is_err());
    }

    #[test]
    fn bytes_and_strings() {
        #[rustfmt::skip]
        let data = [
            b'k', b'e', b'y', 0x00,
            b'v', 0x00,
            0xAA, 0xBB,
            b'x', b'y',
        ];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_string_utf8().unwrap(), "key");
        assert_eq!(parser.read_string_utf8().unwrap(), "v");
        assert_eq!(parser.read_bytes(2).unwrap(), &[0xAA, 0xBB]);
        assert_eq!(parser.read_string_utf8().unwrap(), "xy");
        assert_eq!(parser.pos(), data.len());
        assert!(parser.read_bytes(1).is_err());
    }
}
