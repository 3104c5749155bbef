//! Stream headers of the metadata root.
//!
//! # Reference
//! - [ECMA-335 II.24.2.2](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::ByteBuffer,
    tree::{NodeId, NodeKind, Tree},
    utils::align_to,
    Result,
};

/// A stream header provides the name, and the position and length of a particular table or
/// heap. The length of a stream header is not fixed, but depends on the length of its name
/// field, a zero-terminated string padded to a multiple of 4 bytes.
///
/// ## Reference
/// * '<https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf>' - II.24.2.2
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of this stream in bytes, shall be a multiple of 4
    pub size: u32,
    /// Name of the stream, at most 32 characters
    pub name: String,
}

impl StreamHeader {
    /// Reads the stream header at `offset`, returning it with its encoded length.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the header or its padded name exceed the
    /// buffer, and [`crate::Error::Malformed`] if the name is longer than 32 characters.
    pub fn read(buffer: &ByteBuffer, offset: usize) -> Result<(StreamHeader, usize)> {
        let stream_offset = buffer.read_le::<u32>(offset)?;
        let size = buffer.read_le::<u32>(offset + 4)?;

        let name_len = buffer.zstring_len(offset + 8)?;
        if name_len > 32 {
            return Err(malformed_error!(
                "Stream name at {:#x} exceeds 32 characters",
                offset + 8
            ));
        }
        let padded = align_to(name_len, 4);
        buffer.ensure(offset + 8, padded)?;
        let raw = buffer.slice(offset + 8, name_len - 1)?;

        Ok((
            StreamHeader {
                offset: stream_offset,
                size,
                name: String::from_utf8_lossy(raw).into_owned(),
            },
            8 + padded,
        ))
    }
}

/// Parse hook of a stream header.
pub(crate) fn parse_stream_header(tree: &mut Tree, id: NodeId) -> Result<()> {
    tree.append(id, NodeKind::U32, "Offset")?;
    tree.append(id, NodeKind::U32, "Size")?;
    tree.append(id, NodeKind::AlignedZString, "Name")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let buffer = ByteBuffer::from_mem(vec![
            0x6C, 0x00, 0x00, 0x00,
            0x1C, 0x01, 0x00, 0x00,
            b'#', b'S', b't', b'r', b'i', b'n', b'g', b's', 0x00, 0x00, 0x00, 0x00,
            0x88, 0x01, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            b'#', b'~', 0x00, 0x00,
        ]);

        let (header, length) = StreamHeader::read(&buffer, 0).unwrap();
        assert_eq!(header.offset, 0x6C);
        assert_eq!(header.size, 0x11C);
        assert_eq!(header.name, "#Strings");
        assert_eq!(length, 20);

        let (header, length) = StreamHeader::read(&buffer, 20).unwrap();
        assert_eq!(header.name, "#~");
        assert_eq!(header.size, 0x10);
        assert_eq!(length, 12);
    }

    #[test]
    fn unterminated() {
        let buffer = ByteBuffer::from_mem(vec![0, 0, 0, 0, 4, 0, 0, 0, b'#', b'U', b'S']);
        assert!(StreamHeader::read(&buffer, 0).is_err());
    }
}
