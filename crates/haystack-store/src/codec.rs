//! Binary codec (C2): big-endian fixed-width integer pack/unpack into
//! caller-provided byte windows.
//!
//! The codec has no state. Errors are programming errors only — callers
//! must pass buffers of the exact width for the integer being packed or
//! unpacked.

use crate::error::StoreError;

fn check_width(buf: &[u8], expected: usize) -> Result<(), StoreError> {
    if buf.len() != expected {
        return Err(StoreError::BufferMismatch {
            expected,
            actual: buf.len(),
        });
    }
    Ok(())
}

macro_rules! codec_pair {
    ($put:ident, $get:ident, $ty:ty, $width:literal) => {
        #[doc = concat!("Writes a big-endian `", stringify!($ty), "` into `buf`.")]
        pub fn $put(buf: &mut [u8], value: $ty) -> Result<(), StoreError> {
            check_width(buf, $width)?;
            buf.copy_from_slice(&value.to_be_bytes());
            Ok(())
        }

        #[doc = concat!("Reads a big-endian `", stringify!($ty), "` from `buf`.")]
        pub fn $get(buf: &[u8]) -> Result<$ty, StoreError> {
            check_width(buf, $width)?;
            let mut bytes = [0u8; $width];
            bytes.copy_from_slice(buf);
            Ok(<$ty>::from_be_bytes(bytes))
        }
    };
}

codec_pair!(put_u16, get_u16, u16, 2);
codec_pair!(put_i16, get_i16, i16, 2);
codec_pair!(put_u32, get_u32, u32, 4);
codec_pair!(put_i32, get_i32, i32, 4);
codec_pair!(put_u64, get_u64, u64, 8);
codec_pair!(put_i64, get_i64, i64, 8);
