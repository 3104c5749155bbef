//! The `#Blob` heap: binary entries with a compressed length prefix, addressed by byte offset.
//!
//! # Reference
//! - [ECMA-335 II.24.2.4](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    file::parser::read_compressed_uint,
    metadata::streams::is_zero_tail,
    tree::{NewNode, NodeId, NodeKind, Tree},
    Result,
};

/// A view over the bytes of a `#Blob` heap.
///
/// ```rust
/// use dotlayout::metadata::streams::Blob;
///
/// let heap = Blob::from(&[0x00, 0x03, 0x06, 0x08, 0x01])?;
/// assert_eq!(heap.get(1)?, &[0x06, 0x08, 0x01]);
/// assert!(heap.get(0)?.is_empty());
/// # Ok::<(), dotlayout::Error>(())
/// ```
#[derive(Clone, Copy)]
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Creates a view over heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap does not start with the empty blob.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// The payload of the blob at `index`, without its length prefix.
    ///
    /// # Errors
    /// Returns an error if `index` or the declared length exceed the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        let (start, length) = self.entry(index)?;
        Ok(&self.data[start..start + length])
    }

    /// Offset of the payload relative to the heap and its length.
    pub(crate) fn entry(&self, index: usize) -> Result<(usize, usize)> {
        let Some(tail) = self.data.get(index..) else {
            return Err(malformed_error!("Blob index {} is out of range", index));
        };
        let (length, prefix) = read_compressed_uint(tail)?;
        let start = index + prefix;
        let length = length as usize;
        if start + length > self.data.len() {
            return Err(malformed_error!(
                "Blob at index {} declares {} bytes past the end of the heap",
                index,
                length
            ));
        }
        Ok((start, length))
    }
}

/// Parse hook of the `#Blob` heap: one `BlobEntry` per entry, trailing zeros left as padding.
pub(crate) fn parse_blob_heap(tree: &mut Tree, id: NodeId) -> Result<()> {
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
                "blob at {:#x} declares {} bytes past the end of #Blob",
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
            NewNode::new(NodeKind::BlobEntry, "Blob")
                .at(span.start + position)
                .len(total),
        )?;
    }
    Ok(())
}

/// Parse hook of one blob entry: the length prefix and the payload.
pub(crate) fn parse_blob_entry(tree: &mut Tree, id: NodeId) -> Result<()> {
    let prefix = tree.append(id, NodeKind::CompressedInt, "Length")?;
    let length = tree.get(prefix).as_u64().unwrap_or_default() as usize;
    tree.append_bytes(id, "Data", length)?;
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
            0x04, 0x20, 0x00, 0x01, 0x08,
            0x81, 0x02,
        ];
        let mut data = data.to_vec();
        data.extend(std::iter::repeat(0xAB).take(0x102));

        let blob = Blob::from(&data).unwrap();
        assert_eq!(blob.get(1).unwrap(), &[0x20, 0x00, 0x01, 0x08]);
        assert_eq!(blob.get(6).unwrap().len(), 0x102);
        assert!(blob.get(0).unwrap().is_empty());
        assert!(blob.get(500).is_err());
    }

    #[test]
    fn past_end() {
        let blob = Blob::from(&[0x00, 0x05, 0x01]).unwrap();
        assert!(blob.get(1).is_err());
    }
}
