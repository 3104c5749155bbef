//! The `#GUID` heap: a sequence of 16-byte GUIDs, addressed by 1-based index.
//!
//! # Reference
//! - [ECMA-335 II.24.2.5](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf)

use crate::{
    tree::{NodeId, NodeKind, Tree},
    Result,
};

/// A view over the bytes of a `#GUID` heap.
#[derive(Clone, Copy)]
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Creates a view over heap bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap cannot hold a single GUID.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() < 16 {
            return Err(malformed_error!("Data for #GUID heap is too small"));
        }

        Ok(Guid { data })
    }

    /// The GUID at the 1-based `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for index 0 or an index past the end of the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        let start = index
            .checked_sub(1)
            .map(|slot| slot * 16)
            .filter(|start| start + 16 <= self.data.len())
            .ok_or_else(|| malformed_error!("GUID index {} is out of range", index))?;

        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[start..start + 16]);
        Ok(uguid::Guid::from_bytes(buffer))
    }

    /// Number of GUIDs in the heap.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len() / 16
    }

    /// Returns `true` if the heap holds no complete GUID.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parse hook of the `#GUID` heap: one node per complete GUID.
pub(crate) fn parse_guid_heap(tree: &mut Tree, id: NodeId) -> Result<()> {
    let count = tree.get(id).len() / 16;
    for _ in 0..count {
        tree.append(id, NodeKind::Guid, "GUID")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        #[rustfmt::skip]
        let data : [u8; 48] = [
            0x8e, 0x90, 0x37, 0xd4, 0xe6, 0x65, 0x7c, 0x48, 0x97, 0x35, 0x7b, 0xdf, 0xf6, 0x99, 0xbe, 0xa5,
            0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let guids = Guid::from(&data).unwrap();
        assert_eq!(guids.len(), 3);
        assert_eq!(
            guids.get(1).unwrap(),
            uguid::guid!("d437908e-65e6-487c-9735-7bdff699bea5")
        );
        assert_eq!(
            guids.get(2).unwrap(),
            uguid::guid!("AAAAAAAA-AAAA-AAAA-AAAA-AAAAAAAAAAAA")
        );
        assert_eq!(
            guids.get(3).unwrap(),
            uguid::guid!("00000000-0000-0000-0000-000000000000")
        );
        assert!(guids.get(0).is_err());
        assert!(guids.get(4).is_err());
    }
}
