//! # dotlayout Prelude
//!
//! The types needed to parse an image, walk its tree and compare two trees, for glob import:
//!
//! ```rust,no_run
//! use dotlayout::prelude::*;
//!
//! let left = dotlayout::parse(ByteBuffer::from_file("a.dll")?)?;
//! let right = dotlayout::parse_with(ByteBuffer::from_file("b.dll")?, ParseConfig::headers_only())?;
//! let difference: Difference = dotlayout::diff(&left, &right);
//! println!("{} differences", difference.len());
//! # Ok::<(), dotlayout::Error>(())
//! ```

pub use crate::{
    config::{DiffConfig, ParseConfig},
    diff::{compare_strings, compare_table_counts, Difference},
    file::ByteBuffer,
    metadata::{
        streams::{Blob, Guid, HeapKind, Strings, UserStrings},
        tables::{TableId, TableStream},
    },
    tree::{CoverageIssue, NodeId, NodeKind, NodeRef, Span, Tree},
    Error, Result,
};
