pub mod check;
pub mod diff;
pub mod dump;
pub mod tables;

use std::path::Path;

use anyhow::Context;
use dotlayout::{ByteBuffer, ParseConfig, Tree};

/// Signature of a metadata root, the first bytes of a standalone portable PDB.
const METADATA_SIGNATURE: &[u8] = b"BSJB";

/// Parse a PE image, or a standalone portable PDB if the file starts with a metadata root.
pub fn load_tree(path: &Path) -> anyhow::Result<Tree> {
    let buffer = ByteBuffer::from_file(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;

    let tree = if buffer.data().starts_with(METADATA_SIGNATURE) {
        dotlayout::parse_pdb(buffer, ParseConfig::default())
    } else {
        dotlayout::parse(buffer)
    };
    let tree = tree.with_context(|| format!("failed to parse: {}", path.display()))?;

    log::debug!("{}: {} nodes", path.display(), tree.len());
    Ok(tree)
}

/// Extract a display-friendly filename from a path.
pub fn file_display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or_else(|| path.display().to_string(), str::to_string)
}
