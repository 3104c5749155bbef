//! Shared, read-only access to the bytes of an image.
//!
//! Every node of a [`crate::Tree`] describes a byte range of one [`crate::file::ByteBuffer`].
//! The buffer itself carries no parse state: it answers bounds-checked, typed little-endian
//! reads at absolute offsets and nothing else. All offset arithmetic lives in the decoders.
//!
//! # Key Components
//!
//! - [`crate::file::ByteBuffer`] - Cheaply clonable handle to the image bytes
//! - [`crate::file::Backend`] - Trait for the data source behind a buffer
//! - [`crate::file::parser::Parser`] - Cursor for sequentially encoded payloads
//! - [`crate::file::io`] - Typed little-endian reads from plain slices
//!
//! # Data Sources
//!
//! - **Physical files** - read-only memory maps, see [`crate::file::ByteBuffer::from_file`]
//! - **Memory buffers** - owned vectors, see [`crate::file::ByteBuffer::from_mem`]; inflated
//!   embedded PDBs are parsed from such a buffer as well
//!
//! # Examples
//!
//! ```rust
//! use dotlayout::ByteBuffer;
//!
//! let buffer = ByteBuffer::from_mem(vec![0x4D, 0x5A, 0x90, 0x00, 0x80, 0x80]);
//! assert_eq!(buffer.read_le::<u16>(0)?, 0x5A4D);
//! assert_eq!(buffer.read_compressed_uint(4)?, (128, 2));
//! assert!(buffer.read_le::<u32>(4).is_err());
//! # Ok::<(), dotlayout::Error>(())
//! ```

pub mod io;
pub mod parser;

mod memory;
mod physical;

use std::{fmt, path::Path, sync::Arc};

use crate::{file::io::CilIO, Result};
use memory::Memory;
use physical::Physical;

/// Backend trait for file data sources.
///
/// This trait abstracts over the source of image data, allowing for both in-memory and on-disk
/// representations. All implementations must be thread-safe, so that two buffers can be parsed
/// on different threads.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at the given offset and length.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::TruncatedBuffer`] if the requested range is out of bounds.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// A shared, immutable view of the bytes of one image.
///
/// Clones share the same backend.
#[derive(Clone)]
pub struct ByteBuffer {
    backend: Arc<dyn Backend>,
}

impl ByteBuffer {
    /// Memory-maps the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<ByteBuffer> {
        Ok(ByteBuffer {
            backend: Arc::new(Physical::new(path)?),
        })
    }

    /// Takes ownership of an in-memory image.
    #[must_use]
    pub fn from_mem(data: Vec<u8>) -> ByteBuffer {
        ByteBuffer {
            backend: Arc::new(Memory::new(data)),
        }
    }

    /// Total size of the buffer in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Returns `true` for an empty buffer.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backend.len() == 0
    }

    /// The complete contents of the buffer.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.backend.data()
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the range exceeds the buffer.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.backend.data_slice(offset, len)
    }

    /// Checks that `len` bytes are available at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the range exceeds the buffer.
    pub fn ensure(&self, offset: usize, len: usize) -> Result<()> {
        self.backend.data_slice(offset, len).map(|_| ())
    }

    /// Reads a little-endian value of type `T` at the absolute `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the value exceeds the buffer.
    pub fn read_le<T: CilIO>(&self, offset: usize) -> Result<T> {
        let bytes = self.slice(offset, std::mem::size_of::<T>())?;
        io::read_le::<T>(bytes)
    }

    /// Reads a compressed unsigned integer at `offset`, returning the value and the number of
    /// bytes the encoding occupies.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if the encoding exceeds the buffer.
    pub fn read_compressed_uint(&self, offset: usize) -> Result<(u32, usize)> {
        let first = self.read_le::<u8>(offset)?;
        let length = parser::compressed_uint_len(first);
        parser::read_compressed_uint(self.slice(offset, length)?)
    }

    /// Length of the zero-terminated string at `offset`, terminator included.
    ///
    /// # Errors
    /// Returns [`crate::Error::TruncatedBuffer`] if no terminator is found before the end of the
    /// buffer.
    pub fn zstring_len(&self, offset: usize) -> Result<usize> {
        let data = self.data();
        let rest = data.get(offset..).unwrap_or_default();
        match rest.iter().position(|&b| b == 0) {
            Some(position) => Ok(position + 1),
            None => Err(crate::Error::TruncatedBuffer {
                offset,
                length: rest.len() + 1,
                available: data.len(),
            }),
        }
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteBuffer")
            .field("len", &self.len())
            .finish()
    }
}
