//! Small helpers shared by the decoders.

mod decompress;
mod math;

pub use decompress::decompress_deflate;
pub use math::{align_to, to_u32};
