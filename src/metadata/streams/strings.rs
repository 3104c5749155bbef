//! The `#Strings` heap: zero-terminated UTF-8 identifiers, addressed by byte offset.
//!
//! # Reference
//! - [ECMA-335 II.24.2.3](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use std::{ffi::CStr, str};

use crate::{
    metadata::streams::is_zero_tail,
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

/// A view over the bytes of a `#Strings` heap.
///
/// ```rust
/// use dotlayout::metadata::streams::Strings;
///
/// let heap = Strings::from(b"\0<Module>\0Program\0")?;
/// assert_eq!(heap.get(1)?, "<Module>");
/// assert_eq!(heap.get(10)?, "Program");
/// assert_eq!(heap.get(13)?, "gram");
/// # Ok::<(), dotlayout::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Creates a view over heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap does not start with the empty string.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Strings heap is empty"));
        }

        Ok(Strings { data })
    }

    /// The string starting at `index`. Indices may point into the middle of an entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if `index` is out of range or the string is not
    /// terminated or not valid UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        let Some(tail) = self.data.get(index..) else {
            return Err(malformed_error!("String index {} is out of range", index));
        };

        CStr::from_bytes_until_nul(tail)
            .ok()
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }

    /// All entries with their index, starting with the empty string at index 0.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        let data = self.data;
        let mut position = 0;
        std::iter::from_fn(move || {
            if position >= data.len() || (position > 0 && is_zero_tail(data, position)) {
                return None;
            }
            let length = data[position..].iter().position(|b| *b == 0)?;
            let index = position;
            position += length + 1;
            Some((
                index,
                str::from_utf8(&data[index..index + length]).unwrap_or_default(),
            ))
        })
    }
}

/// Parse hook of the `#Strings` heap: one `ZString` per entry, trailing zeros left as padding.
pub(crate) fn parse_strings_heap(tree: &mut Tree, id: NodeId) -> Result<()> {
    let span = tree.get(id).span();
    let data = tree.get(id).bytes();

    let mut entries = Vec::new();
    let mut position = 0;
    while position < data.len() && !(position > 0 && is_zero_tail(data, position)) {
        let Some(length) = data[position..].iter().position(|b| *b == 0) else {
            log::warn!(
                "unterminated string at {:#x} in #Strings",
                span.start + position
            );
            break;
        };
        entries.push((position, length + 1));
        position += length + 1;
    }

    for (position, length) in entries {
        tree.add(
            id,
            NewNode::new(NodeKind::ZString, "String")
                .at(span.start + position)
                .len(length),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data = [
            0x00,
            0x3c, 0x4d, 0x61, 0x69, 0x6e, 0x3e, 0x24, 0x00,
            0x43, 0x5f, 0x53, 0x68, 0x61, 0x72, 0x70, 0x5f, 0x50, 0x4f, 0x43, 0x5f, 0x31, 0x00,
            0x3c, 0x4d, 0x6f, 0x64, 0x75, 0x6c, 0x65, 0x3e, 0x00,
            0x00, 0x00,
        ];

        let str_view = Strings::from(&data).unwrap();
        assert_eq!(str_view.get(1).unwrap(), "<Main>$");
        assert_eq!(str_view.get(9).unwrap(), "C_Sharp_POC_1");
        assert_eq!(str_view.get(23).unwrap(), "<Module>");
        assert!(str_view.get(100).is_err());

        let entries: Vec<_> = str_view.iter().collect();
        assert_eq!(
            entries,
            vec![(0, ""), (1, "<Main>$"), (9, "C_Sharp_POC_1"), (23, "<Module>")]
        );
    }

    #[test]
    fn invalid() {
        assert!(Strings::from(&[]).is_err());
        assert!(Strings::from(b"abc\0").is_err());
    }
}
