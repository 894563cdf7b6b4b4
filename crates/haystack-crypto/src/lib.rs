//! # haystack-crypto: checksum primitives
//!
//! CRC32 over needle payloads, using the Koopman polynomial rather than the
//! more common IEEE 802.3 polynomial.

mod crc32;

pub use crc32::{crc32, Crc32};
