//! CIL method bodies.
//!
//! A method body starts with a tiny or a fat header, followed by the IL code. Fat bodies may be
//! followed by extra data sections, each aligned to 4 bytes; the only defined kind holds
//! exception handling clauses in a small (12-byte) or fat (24-byte) layout.
//!
//! The complete extent of a body is measured with [`MethodHeader::read`] before the body is
//! placed into the tree, since cross-referenced nodes need their length up front.
//!
//! # References
//! - ECMA-335 6th Edition, Partition II, Section 25.4 - Method Header Format

use bitflags::bitflags;

use crate::{
    file::ByteBuffer,
    tree::{NewNode, NodeId, NodeKind, Tree},
    utils::align_to,
    Result,
};

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Flags of a method header
    pub struct MethodBodyFlags: u16 {
        /// Tiny method header format
        const TINY_FORMAT = 0x2;
        /// Fat method header format
        const FAT_FORMAT = 0x3;
        /// Flag of the fat method header, showing that there are more data sections appended to the header
        const MORE_SECTS = 0x8;
        /// Flag to indicate that this method should call the default constructor on all local variables
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    /// Flags that a method body section can have
    pub struct SectionFlags: u8 {
        /// Indicates that this section contains exception handling data
        const EHTABLE = 0x1;
        /// Reserved, shall be 0
        const OPT_ILTABLE = 0x2;
        /// Indicates that the data section format is fat
        const FAT_FORMAT = 0x40;
        /// Indicates that the data section is followed by another one
        const MORE_SECTS = 0x80;
    }
}

const TINY_MASK: u8 = 0b11;
const FAT_HEADER_SIZE: usize = 12;
const SMALL_CLAUSE_SIZE: usize = 12;
const FAT_CLAUSE_SIZE: usize = 24;

/// One extra data section of a fat method body.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DataSection {
    /// Offset relative to the start of the body
    pub offset: usize,
    /// Size including the 4-byte section header
    pub length: usize,
    /// Section flags
    pub flags: SectionFlags,
}

/// The measured layout of one method body.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodHeader {
    /// `true` for a fat header
    pub is_fat: bool,
    /// Header flags; only the format bits for tiny headers
    pub flags: MethodBodyFlags,
    /// Size of the header in bytes
    pub header_size: usize,
    /// Size of the IL code in bytes
    pub code_size: usize,
    /// Maximum number of items on the operand stack, 8 for tiny headers
    pub max_stack: u16,
    /// `StandAloneSig` token of the local variables, 0 if there are none
    pub local_var_sig_token: u32,
    /// Extra data sections, in order
    pub sections: Vec<DataSection>,
}

impl MethodHeader {
    /// Measures the method body at `offset`.
    ///
    /// A first byte whose low two bits are `2` is a tiny header with the code size in the upper
    /// six bits; anything else is read as a fat header.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the header, the code or a data section
    /// exceeds the buffer.
    pub fn read(buffer: &ByteBuffer, offset: usize) -> Result<MethodHeader> {
        let first = buffer.read_le::<u8>(offset)?;
        if first & TINY_MASK == MethodBodyFlags::TINY_FORMAT.bits() as u8 {
            let code_size = usize::from(first >> 2);
            buffer.ensure(offset + 1, code_size)?;
            return Ok(MethodHeader {
                is_fat: false,
                flags: MethodBodyFlags::TINY_FORMAT,
                header_size: 1,
                code_size,
                max_stack: 8,
                local_var_sig_token: 0,
                sections: Vec::new(),
            });
        }

        let word = buffer.read_le::<u16>(offset)?;
        let flags = MethodBodyFlags::from_bits_retain(word & 0x0FFF);
        let declared = usize::from(word >> 12) * 4;
        let header_size = if declared < FAT_HEADER_SIZE {
            log::warn!("fat method header at {offset:#x} declares {declared} bytes");
            FAT_HEADER_SIZE
        } else {
            declared
        };
        let max_stack = buffer.read_le::<u16>(offset + 2)?;
        let code_size = buffer.read_le::<u32>(offset + 4)? as usize;
        let local_var_sig_token = buffer.read_le::<u32>(offset + 8)?;
        buffer.ensure(offset + header_size, code_size)?;

        let mut sections = Vec::new();
        let mut more = flags.contains(MethodBodyFlags::MORE_SECTS);
        let mut cursor = header_size + code_size;
        while more {
            cursor = align_to(cursor, 4);
            let kind = SectionFlags::from_bits_retain(buffer.read_le::<u8>(offset + cursor)?);
            if !kind.contains(SectionFlags::EHTABLE) {
                log::warn!(
                    "method data section at {:#x} has unknown kind {:#x}",
                    offset + cursor,
                    kind.bits()
                );
                break;
            }

            let length = if kind.contains(SectionFlags::FAT_FORMAT) {
                (buffer.read_le::<u32>(offset + cursor)? >> 8) as usize
            } else {
                usize::from(buffer.read_le::<u8>(offset + cursor + 1)?)
            };
            if length < 4 {
                log::warn!(
                    "method data section at {:#x} declares {length} bytes",
                    offset + cursor
                );
                break;
            }
            buffer.ensure(offset + cursor, length)?;

            sections.push(DataSection {
                offset: cursor,
                length,
                flags: kind,
            });
            cursor += length;
            more = kind.contains(SectionFlags::MORE_SECTS);
        }

        Ok(MethodHeader {
            is_fat: true,
            flags,
            header_size,
            code_size,
            max_stack,
            local_var_sig_token,
            sections,
        })
    }

    /// Total size of the body: header, code and all data sections.
    #[must_use]
    pub fn size(&self) -> usize {
        self.sections
            .last()
            .map_or(self.header_size + self.code_size, |section| {
                section.offset + section.length
            })
    }
}

/// Parse hook of a method body.
pub(crate) fn parse_method_body(tree: &mut Tree, id: NodeId) -> Result<()> {
    let start = tree.get(id).start();
    let header = MethodHeader::read(tree.buffer(), start)?;

    if !header.is_fat {
        tree.append(id, NodeKind::U8, "Header")?;
        tree.append_bytes(id, "Code", header.code_size)?;
        return Ok(());
    }

    tree.append(id, NodeKind::U16, "Flags")?;
    tree.append(id, NodeKind::U16, "MaxStack")?;
    tree.append(id, NodeKind::U32, "CodeSize")?;
    tree.append(id, NodeKind::U32, "LocalVarSigTok")?;
    tree.append_bytes(id, "Extra Header", header.header_size - FAT_HEADER_SIZE)?;
    tree.append_bytes(id, "Code", header.code_size)?;

    for section in &header.sections {
        tree.add(
            id,
            NewNode::new(NodeKind::ExceptionSection, "Exception Section")
                .at(start + section.offset)
                .len(section.length),
        )?;
    }
    Ok(())
}

/// Parse hook of an exception handling section: section header and clauses.
pub(crate) fn parse_exception_section(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let kind = SectionFlags::from_bits_retain(tree.buffer().read_le::<u8>(span.start)?);

    tree.append(id, NodeKind::U8, "Kind")?;
    let clause_size = if kind.contains(SectionFlags::FAT_FORMAT) {
        tree.append_bytes(id, "DataSize", 3)?;
        FAT_CLAUSE_SIZE
    } else {
        tree.append(id, NodeKind::U8, "DataSize")?;
        tree.append(id, NodeKind::U16, "Reserved")?;
        SMALL_CLAUSE_SIZE
    };

    for _ in 0..(span.length - 4) / clause_size {
        let Some(clause) = tree.append_bytes(id, "Clause", clause_size)? else {
            break;
        };
        if clause_size == FAT_CLAUSE_SIZE {
            tree.append(clause, NodeKind::U32, "Flags")?;
            tree.append(clause, NodeKind::U32, "TryOffset")?;
            tree.append(clause, NodeKind::U32, "TryLength")?;
            tree.append(clause, NodeKind::U32, "HandlerOffset")?;
            tree.append(clause, NodeKind::U32, "HandlerLength")?;
        } else {
            tree.append(clause, NodeKind::U16, "Flags")?;
            tree.append(clause, NodeKind::U16, "TryOffset")?;
            tree.append(clause, NodeKind::U8, "TryLength")?;
            tree.append(clause, NodeKind::U16, "HandlerOffset")?;
            tree.append(clause, NodeKind::U8, "HandlerLength")?;
        }
        tree.append(clause, NodeKind::U32, "ClassTokenOrFilterOffset")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseConfig;

    fn body_tree(data: Vec<u8>) -> Tree {
        let mut tree = Tree::with_root(
            ByteBuffer::from_mem(data),
            NodeKind::MethodBody,
            "Method",
            ParseConfig::default(),
        );
        tree.parse_root().unwrap();
        tree
    }

    #[test]
    fn tiny() {
        let buffer = ByteBuffer::from_mem(vec![0b0000_0110, 0x2A]);
        let header = MethodHeader::read(&buffer, 0).unwrap();

        assert!(!header.is_fat);
        assert_eq!(header.code_size, 1);
        assert_eq!(header.size(), 2);

        let tree = body_tree(vec![0b0000_0110, 0x2A]);
        let root = tree.root();
        assert_eq!(root.child("Header").unwrap().len(), 1);
        assert_eq!(root.child("Code").unwrap().bytes(), &[0x2A]);
    }

    #[test]
    fn low_bits_other_than_tiny_are_fat() {
        #[rustfmt::skip]
        let data = vec![
            0x01, 0x30, 0x08, 0x00,
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x2A,
        ];
        let buffer = ByteBuffer::from_mem(data);
        let header = MethodHeader::read(&buffer, 0).unwrap();

        assert!(header.is_fat);
        assert_eq!(header.header_size, 12);
        assert_eq!(header.code_size, 1);
        assert_eq!(header.max_stack, 8);
    }

    #[test]
    fn fat_with_small_exception_section() {
        #[rustfmt::skip]
        let data = vec![
            0x1B, 0x30, 0x02, 0x00,             // Flags: fat, more sections, init locals
            0x03, 0x00, 0x00, 0x00,             // CodeSize
            0x01, 0x00, 0x00, 0x11,             // LocalVarSigTok
            0x00, 0x00, 0x2A,                   // Code
            0x00,                               // alignment
            0x01, 0x10, 0x00, 0x00,             // small EH section, 16 bytes
            0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00,
        ];
        let buffer = ByteBuffer::from_mem(data.clone());
        let header = MethodHeader::read(&buffer, 0).unwrap();

        assert!(header.flags.contains(MethodBodyFlags::INIT_LOCALS));
        assert_eq!(header.local_var_sig_token, 0x1100_0001);
        assert_eq!(header.sections.len(), 1);
        assert_eq!(header.sections[0].offset, 16);
        assert_eq!(header.size(), 32);

        let tree = body_tree(data);
        let section = tree.root().child("Exception Section").unwrap();
        assert_eq!(section.start(), 16);
        let clause = section.child("Clause").unwrap();
        assert_eq!(clause.len(), 12);
        assert_eq!(clause.child("HandlerOffset").unwrap().as_u64(), Some(1));
        assert!(tree.check_coverage().is_empty());
    }

    #[test]
    fn truncated_code() {
        let buffer = ByteBuffer::from_mem(vec![0b0001_0010, 0x00]);
        assert!(matches!(
            MethodHeader::read(&buffer, 0),
            Err(crate::Error::TruncatedBuffer { .. })
        ));
    }
}
