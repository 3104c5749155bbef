use super::Backend;
use crate::{Error::TruncatedBuffer, Result};

/// Image held in an owned byte vector.
///
/// Used for buffers handed in by the caller and for inflated embedded PDBs.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The data buffer to consume
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let truncated = || TruncatedBuffer {
            offset,
            length: len,
            available: self.data.len(),
        };

        let Some(offset_end) = offset.checked_add(len) else {
            return Err(truncated());
        };

        if offset_end > self.data.len() {
            return Err(truncated());
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory() {
        let mut data = vec![0xCC_u8; 1048];
        data[10..15].fill(0xBB);

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 1048);
        assert_eq!(memory.data()[42], 0xCC);
        assert_eq!(
            memory.data_slice(10, 5).unwrap(),
            &[0xBB, 0xBB, 0xBB, 0xBB, 0xBB]
        );

        assert!(memory
            .data_slice(u32::MAX as usize, u32::MAX as usize)
            .is_err());
        assert!(memory.data_slice(0, 2048).is_err());
    }

    #[test]
    fn empty_buffer() {
        let memory = Memory::new(vec![]);

        assert_eq!(memory.len(), 0);
        assert!(memory.data_slice(0, 1).is_err());
        assert!(memory.data_slice(1, 0).is_err());
        let empty_slice: &[u8] = &[];
        assert_eq!(memory.data_slice(0, 0).unwrap(), empty_slice);
    }

    #[test]
    fn truncation_reports_request() {
        let memory = Memory::new(vec![0x00; 100]);

        match memory.data_slice(99, 2) {
            Err(TruncatedBuffer {
                offset,
                length,
                available,
            }) => {
                assert_eq!(offset, 99);
                assert_eq!(length, 2);
                assert_eq!(available, 100);
            }
            other => panic!("unexpected result {other:?}"),
        }

        assert!(matches!(
            memory.data_slice(usize::MAX, 1),
            Err(TruncatedBuffer { .. })
        ));
    }
}
