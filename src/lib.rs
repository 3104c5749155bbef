// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # dotlayout
//!
//! [![Crates.io](https://img.shields.io/crates/v/dotlayout.svg)](https://crates.io/crates/dotlayout)
//! [![Documentation](https://docs.rs/dotlayout/badge.svg)](https://docs.rs/dotlayout)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/BinFlip/dotlayout/blob/main/LICENSE-APACHE)
//!
//! Offset-exact structural decoding of .NET PE executables, and structural diffing of two of
//! them. Every byte of the file is attributed to exactly one leaf of a tree of labelled spans:
//! PE headers, sections, data directories, the CLI header, metadata streams and tables,
//! method bodies, mapped field data, managed resources and embedded portable PDBs.
//!
//! ## Features
//!
//! - **📦 Complete coverage** - every byte of the image belongs to exactly one leaf, unclaimed
//!   bytes are explicit padding
//! - **🔍 Cross-references at their true offsets** - structures found through RVAs and table
//!   rows are inserted where they live in the file, not where they were discovered
//! - **🧩 Embedded PDBs** - inflated and parsed as independent trees, linked to their owner
//! - **⚖️ Structural diff** - children aligned by label, so insertions don't cascade into
//!   spurious changes
//! - **🛡️ Memory safe** - offsets are checked before every read, malformed input is an error,
//!   never a panic
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dotlayout::prelude::*;
//!
//! let tree = dotlayout::parse(ByteBuffer::from_file("tests/samples/app.dll")?)?;
//! for (depth, node) in tree.walk() {
//!     println!("{:indent$}{} {}", "", node.span(), node.label(), indent = depth * 2);
//! }
//! # Ok::<(), dotlayout::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`tree`] - the node arena, cross-reference insertion and coverage
//! - [`pe`] - DOS / PE / section headers and the data directories
//! - [`metadata`] - CLI header, metadata root, heaps, the table stream and what its rows point to
//! - [`diff`] - sequence alignment and the difference engine
//! - [`file`] - memory and memory-mapped buffers with bounds-checked reads
//! - [`Error`] and [`Result`] - decoding errors carry the absolute offset of the failure
//!
//! ## Standards Compliance
//!
//! - [ECMA-335 Standard](https://ecma-international.org/wp-content/uploads/ECMA-335_6th_edition_june_2012.pdf) - metadata and method bodies
//! - [PE Format](https://learn.microsoft.com/en-us/windows/win32/debug/pe-format) - image headers
//! - [Portable PDB](https://github.com/dotnet/runtime/blob/main/docs/design/specs/PortablePdb-Metadata.md) - `#Pdb` stream and debug tables
//!
//! ## Error Handling
//!
//! ```rust,no_run
//! use dotlayout::{ByteBuffer, Error};
//!
//! match dotlayout::parse(ByteBuffer::from_file("tests/samples/crafted.exe")?) {
//!     Ok(tree) => println!("{} nodes", tree.len()),
//!     Err(Error::UnresolvableRva { rva, offset }) => println!("RVA {rva:#x} at {offset:#x}"),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! # Ok::<(), dotlayout::Error>(())
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run parse --release
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use dotlayout::prelude::*;
///
/// let tree = dotlayout::parse(ByteBuffer::from_file("tests/samples/app.dll")?)?;
/// let issues: Vec<CoverageIssue> = tree.check_coverage();
/// assert!(issues.is_empty());
/// # Ok::<(), dotlayout::Error>(())
/// ```
pub mod prelude;

pub mod config;
pub mod diff;
pub mod file;
pub mod metadata;
pub mod pe;
pub mod tree;
pub mod utils;

/// `dotlayout` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

pub use config::{DiffConfig, ParseConfig};
pub use diff::Difference;
pub use error::Error;
pub use file::ByteBuffer;
pub use tree::{CoverageIssue, NodeId, NodeKind, NodeRef, Span, Tree};

/// Parses a PE image with the default [`ParseConfig`].
///
/// # Errors
/// Returns the first decoding error; there is no partial tree.
///
/// # Example
///
/// ```rust,no_run
/// let buffer = dotlayout::ByteBuffer::from_file("tests/samples/app.dll")?;
/// let tree = dotlayout::parse(buffer)?;
/// println!("{} leaves", tree.leaves().len());
/// # Ok::<(), dotlayout::Error>(())
/// ```
pub fn parse(buffer: ByteBuffer) -> Result<Tree> {
    parse_with(buffer, ParseConfig::default())
}

/// Parses a PE image.
///
/// # Errors
/// Returns the first decoding error; there is no partial tree.
pub fn parse_with(buffer: ByteBuffer, config: ParseConfig) -> Result<Tree> {
    log::debug!("parsing PE image of {} bytes", buffer.len());
    let mut tree = Tree::with_root(buffer, NodeKind::PeFile, "PE File", config);
    tree.parse_root()?;
    Ok(tree)
}

/// Parses a standalone portable PDB, which is a bare metadata root.
///
/// # Errors
/// Returns the first decoding error; there is no partial tree.
pub fn parse_pdb(buffer: ByteBuffer, config: ParseConfig) -> Result<Tree> {
    log::debug!("parsing portable PDB of {} bytes", buffer.len());
    let mut tree = Tree::with_root(buffer, NodeKind::MetadataRoot, "Metadata Root", config);
    tree.parse_root()?;
    Ok(tree)
}

/// Compares two trees with the default [`DiffConfig`].
#[must_use]
pub fn diff<'a>(left: &'a Tree, right: &'a Tree) -> Difference<'a> {
    diff::diff_trees(left, right, &DiffConfig::default())
}

/// Compares two trees.
#[must_use]
pub fn diff_with<'a>(left: &'a Tree, right: &'a Tree, config: &DiffConfig) -> Difference<'a> {
    diff::diff_trees(left, right, config)
}
