use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every decoding error carries the absolute file offset of the structure that could not be
/// decoded. Any of them aborts the whole parse: there is no partial tree, because every later
/// offset computation depends on the earlier ones being correct.
///
/// # Error Categories
///
/// ## Decoding Errors
/// - [`Error::TruncatedBuffer`] - A required field extends past the end of the buffer
/// - [`Error::BadMagic`] - A DOS, PE, metadata root or embedded PDB signature mismatch
/// - [`Error::UnresolvableRva`] - An RVA is not covered by any section
/// - [`Error::UnsupportedTableKind`] - A metadata table bit is set that has no known schema
/// - [`Error::InconsistentHeapFlags`] - A wide heap index is declared for an absent heap
/// - [`Error::Malformed`] - Any other structural inconsistency
/// - [`Error::Decompression`] - An embedded portable PDB could not be inflated
///
/// ## I/O Errors
/// - [`Error::FileError`] - Filesystem errors of the file backed buffer
///
/// # Examples
///
/// ```rust,no_run
/// use dotlayout::{ByteBuffer, Error};
///
/// let buffer = ByteBuffer::from_mem(vec![0u8; 32]);
/// match dotlayout::parse(buffer) {
///     Ok(tree) => println!("{} nodes", tree.len()),
///     Err(Error::TruncatedBuffer { offset, .. }) => eprintln!("truncated at {offset:#x}"),
///     Err(e) => eprintln!("error: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A read of `length` bytes at `offset` would exceed the `available` bytes of the buffer.
    #[error("Truncated buffer - reading {length} bytes at {offset:#x}, only {available} available")]
    TruncatedBuffer {
        /// Absolute offset of the attempted read
        offset: usize,
        /// Number of bytes that were requested
        length: usize,
        /// Total size of the underlying buffer
        available: usize,
    },

    /// A signature field did not hold its required constant.
    #[error("Bad magic at {offset:#x} - expected {expected:#x}, found {found:#x}")]
    BadMagic {
        /// Absolute offset of the signature
        offset: usize,
        /// The required value
        expected: u32,
        /// The value read from the buffer
        found: u32,
    },

    /// A non-zero RVA did not fall into any section (nor into the image headers).
    #[error("RVA {rva:#x} referenced at {offset:#x} is not covered by any section")]
    UnresolvableRva {
        /// The RVA that could not be resolved
        rva: u32,
        /// Absolute offset of the field holding the RVA
        offset: usize,
    },

    /// The table presence vector announces a table this library has no schema for, which
    /// indicates a newer metadata format revision.
    #[error("Unsupported metadata table {table:#04x} in table stream at {offset:#x}")]
    UnsupportedTableKind {
        /// The bit position of the unknown table
        table: u8,
        /// Absolute offset of the table stream
        offset: usize,
    },

    /// The heap-size flags declare wide indices for a heap that is not present in the image.
    #[error("Heap size flags declare wide indices into absent heap '{heap}' at {offset:#x}")]
    InconsistentHeapFlags {
        /// The name of the absent heap
        heap: &'static str,
        /// Absolute offset of the heap-size flags byte
        offset: usize,
    },

    /// The file is damaged and could not be parsed.
    ///
    /// Covers structural inconsistencies that none of the specific kinds above describe, for
    /// example children that would overlap a sibling after parsing.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// The deflate payload of an embedded portable PDB could not be inflated.
    #[error("Failed to decompress embedded PDB at {offset:#x} - {message}")]
    Decompression {
        /// Absolute offset of the compressed payload
        offset: usize,
        /// Description of the failure
        message: String,
    },

    /// File I/O error.
    ///
    /// Wraps errors of the memory-mapped file backend.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}

impl Error {
    /// Returns the absolute offset this error is attached to, if it has one.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::TruncatedBuffer { offset, .. }
            | Error::BadMagic { offset, .. }
            | Error::UnresolvableRva { offset, .. }
            | Error::UnsupportedTableKind { offset, .. }
            | Error::InconsistentHeapFlags { offset, .. }
            | Error::Decompression { offset, .. } => Some(*offset),
            Error::Malformed { .. } | Error::FileError(_) => None,
        }
    }
}
