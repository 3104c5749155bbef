//! Mathematical utility functions.

use crate::Result;

/// Rounds `value` up to the next multiple of `alignment`, which must be a power of two.
///
/// # Examples
///
/// ```rust,ignore
/// assert_eq!(align_to(5, 4), 8);
/// assert_eq!(align_to(8, 4), 8);
/// ```
#[must_use]
pub fn align_to(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Converts a `usize` to `u32`, returning an error if the value exceeds `u32::MAX`. Offsets
/// and sizes inside a PE image are bounded by 32 bits.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if `value` exceeds `u32::MAX`.
pub fn to_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| malformed_error!("value {value} exceeds u32::MAX"))
}
