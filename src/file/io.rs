//! Low-level little-endian reading utilities.
//!
//! PE/COFF and ECMA-335 structures are exclusively little-endian. This module provides the
//! [`crate::file::io::CilIO`] trait, implemented for the fixed-width integer types, and
//! bounds-checked free functions that read them from byte slices.
//!
//! # Key Components
//!
//! - [`crate::file::io::CilIO`] - Conversion of fixed-size byte arrays into integers
//! - [`crate::file::io::read_le`] - Read a value from the start of a slice
//! - [`crate::file::io::read_le_at`] - Read a value at an offset and advance the offset
//! - [`crate::file::io::read_le_at_dyn`] - Read a 2 or 4 byte index, depending on a width flag
//!
//! # Error Handling
//!
//! All functions return [`crate::Error::TruncatedBuffer`] if the slice holds fewer bytes than
//! the requested type needs. Offsets reported by these functions are relative to the slice; the
//! [`crate::file::ByteBuffer`] translates them into absolute file offsets.

use crate::{Error::TruncatedBuffer, Result};

/// Trait for type-specific safe binary data reading operations.
///
/// Each implementation defines a `Bytes` associated type that represents the fixed-size byte
/// array required for that particular type (e.g., `[u8; 4]` for `u32`).
pub trait CilIO: Sized + Copy {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Widen the value to `u64`, for uniform rendering and comparison
    fn to_u64(self) -> u64;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $size:expr),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $size];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                #[allow(clippy::cast_sign_loss)]
                fn to_u64(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_cil_io!(
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
);

/// Safely reads a value of type `T` in little-endian byte order from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::TruncatedBuffer`] if `data` is shorter than `size_of::<T>()`.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Safely reads a value of type `T` in little-endian byte order at `offset`, advancing the
/// offset by the size of `T` on success.
///
/// # Errors
/// Returns [`crate::Error::TruncatedBuffer`] if fewer than `size_of::<T>()` bytes are available
/// at `offset`.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let truncated = || TruncatedBuffer {
        offset: *offset,
        length: type_len,
        available: data.len(),
    };

    let end = offset.checked_add(type_len).ok_or_else(truncated)?;
    if end > data.len() {
        return Err(truncated());
    }

    let Ok(bytes) = data[*offset..end].try_into() else {
        return Err(truncated());
    };

    *offset = end;
    Ok(T::from_le_bytes(bytes))
}

/// Reads a metadata index that is either 2 or 4 bytes wide and advances the offset.
///
/// # Arguments
/// * `data` - The slice to read from
/// * `offset` - The position to read at, advanced past the value
/// * `is_large` - `true` for a 4 byte index, `false` for a 2 byte index
///
/// # Errors
/// Returns [`crate::Error::TruncatedBuffer`] if the value does not fit into `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    if is_large {
        read_le_at::<u32>(data, offset)
    } else {
        Ok(u32::from(read_le_at::<u16>(data, offset)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_le_u8() {
        let result = read_le::<u8>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x01);
    }

    #[test]
    fn read_le_u16() {
        let result = read_le::<u16>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0201);
    }

    #[test]
    fn read_le_u32() {
        let result = read_le::<u32>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0403_0201);
    }

    #[test]
    fn read_le_u64() {
        let result = read_le::<u64>(&TEST_BUFFER).unwrap();
        assert_eq!(result, 0x0807_0605_0403_0201);
    }

    #[test]
    fn read_le_i16_negative() {
        let result = read_le::<i16>(&[0xFE, 0xFF]).unwrap();
        assert_eq!(result, -2);
    }

    #[test]
    fn read_le_at_advances() {
        let mut offset = 0;
        assert_eq!(read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap(), 0x0201);
        assert_eq!(offset, 2);
        assert_eq!(read_le_at::<u32>(&TEST_BUFFER, &mut offset).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn read_le_at_dyn_widths() {
        let mut offset = 0;
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(), 0x0201);
        assert_eq!(offset, 2);
        assert_eq!(
            read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(),
            0x0605_0403
        );
        assert_eq!(offset, 6);
    }

    #[test]
    fn errors() {
        let buffer = [0xFF, 0xFF, 0xFF, 0xFF];

        let result = read_le::<u64>(&buffer);
        assert!(matches!(
            result,
            Err(TruncatedBuffer {
                offset: 0,
                length: 8,
                available: 4
            })
        ));

        let mut offset = 3;
        assert!(read_le_at::<u16>(&buffer, &mut offset).is_err());
        assert_eq!(offset, 3);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&buffer, &mut offset).is_err());
    }

    #[test]
    fn to_u64_widening() {
        assert_eq!(0xAB_u8.to_u64(), 0xAB);
        assert_eq!(0xBEEF_u16.to_u64(), 0xBEEF);
        assert_eq!(0xDEAD_BEEF_u32.to_u64(), 0xDEAD_BEEF);
    }
}
