//! Synthetic images and end-to-end scenarios over them.

mod image;

pub use image::*;
