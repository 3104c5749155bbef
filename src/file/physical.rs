//! Memory-mapped file backend.
//!
//! [`crate::file::physical::Physical`] maps an image read-only into the address space instead
//! of reading it into a vector, which keeps large assemblies cheap to open. The mapping stays
//! alive for as long as the owning [`crate::file::ByteBuffer`] (and every tree built from it).

use super::Backend;
use crate::{
    Error::{FileError, TruncatedBuffer},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A backend that serves reads from a read-only memory map of a file on disk.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical file backend by memory-mapping the specified file.
    ///
    /// # Arguments
    /// * `path` - Path to the image on disk
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        // The mapping is read-only; concurrent modification of the file by another process is
        // outside of what this library can guard against.
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(FileError(error)),
        };

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
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
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "dotlayout_physical_{}_{}",
            std::process::id(),
            name
        ));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn physical() {
        let path = temp_file("basic", b"MZ\x90\x00\x03\x00\x00\x00");
        let physical = Physical::new(&path).unwrap();

        assert_eq!(physical.len(), 8);
        assert_eq!(physical.data_slice(0, 2).unwrap(), b"MZ");
        assert_eq!(physical.data()[4], 0x03);
        assert!(physical.data_slice(6, 4).is_err());
        assert!(physical.data_slice(usize::MAX, 2).is_err());

        drop(physical);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file() {
        let result = Physical::new("/definitely/not/a/real/path/image.dll");
        assert!(matches!(result, Err(FileError(_))));
    }
}
