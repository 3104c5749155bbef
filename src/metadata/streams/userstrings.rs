//! The `#US` heap: UTF-16 string literals with a compressed length prefix and a terminal byte.
//!
//! The length counts the UTF-16 bytes plus the terminal byte, which is 1 if any character needs
//! special handling beyond 8-bit processing.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use widestring::U16String;

use crate::{
    file::parser::read_compressed_uint,
    metadata::streams::is_zero_tail,
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

/// A view over the bytes of a `#US` heap.
///
/// ```rust
/// use dotlayout::metadata::streams::UserStrings;
///
/// let heap = UserStrings::from(&[0x00, 0x05, b'H', 0x00, b'i', 0x00, 0x00])?;
/// assert_eq!(heap.get(1)?.to_string_lossy(), "Hi");
/// # Ok::<(), dotlayout::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct UserStrings<'a> {
    data: &'a [u8],
}

impl<'a> UserStrings<'a> {
    /// Creates a view over heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap does not start with the empty entry.
    pub fn from(data: &'a [u8]) -> Result<UserStrings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #US heap"));
        }

        Ok(UserStrings { data })
    }

    /// The string at `index`, without its terminal byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` or the declared length exceed the heap.
    pub fn get(&self, index: usize) -> Result<U16String> {
        let Some(tail) = self.data.get(index..) else {
            return Err(malformed_error!("User string index {} is out of range", index));
        };
        let (length, prefix) = read_compressed_uint(tail)?;
        let length = length as usize;
        let Some(bytes) = tail.get(prefix..prefix + length) else {
            return Err(malformed_error!(
                "Invalid string data length at index - {}",
                index
            ));
        };

        let text = &bytes[..length.saturating_sub(1) & !1];
        Ok(U16String::from_vec(
            text.chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect::<Vec<u16>>(),
        ))
    }
}

/// Parse hook of the `#US` heap: one `UserStringEntry` per entry, trailing zeros left as
/// padding.
pub(crate) fn parse_user_strings_heap(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let data = tree.get(id).bytes();

    let mut entries = Vec::new();
    let mut position = 0;
    while position < data.len() && !(position > 0 && is_zero_tail(data, position)) {
        let Ok((length, prefix)) = read_compressed_uint(&data[position..]) else {
            break;
        };
        let total = prefix + length as usize;
        if position + total > data.len() {
            log::warn!(
                "user string at {:#x} declares {} bytes past the end of #US",
                span.start + position,
                length
            );
            break;
        }
        entries.push((position, total));
        position += total;
    }

    for (position, total) in entries {
        tree.add(
            id,
            NewNode::new(NodeKind::UserStringEntry, "UserString")
                .at(span.start + position)
                .len(total),
        )?;
    }
    Ok(())
}

/// Parse hook of one user string: length, UTF-16 text and terminal byte.
pub(crate) fn parse_user_string(tree: &mut Tree, id: NodeId) -> Result<()> {
    let prefix = tree.append(id, NodeKind::CompressedInt, "Length")?;
    let length = tree.get(prefix).as_u64().unwrap_or_default() as usize;
    if length == 0 {
        return Ok(());
    }

    if length > 1 {
        tree.add(id, NewNode::new(NodeKind::Utf16, "Text").len(length - 1))?;
    }
    tree.append(id, NodeKind::U8, "Terminal")?;
    Ok(())
}
