//! CRC32 using the Koopman polynomial (reflected form `0xEB31D8_2E`).
//!
//! Go's standard library calls this table `crc32.MakeTable(crc32.Koopman)`.
//! It is unrelated to the IEEE 802.3 polynomial most CRC32 implementations
//! default to, so needles written by this store are not checksum-compatible
//! with a generic `crc32` tool.

/// Reflected Koopman polynomial.
const POLY: u32 = 0xEB31_D82E;

const fn generate_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY
            } else {
                crc >> 1
            };
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static TABLE: [u32; 256] = generate_table();

/// Incremental CRC32 accumulator.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { state: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, data: &[u8]) {
        let mut crc = self.state;
        for &byte in data {
            let idx = ((crc ^ u32::from(byte)) & 0xFF) as usize;
            crc = (crc >> 8) ^ TABLE[idx];
        }
        self.state = crc;
    }

    pub fn finalize(self) -> u32 {
        self.state ^ 0xFFFF_FFFF
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC32 of a byte slice.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(data);
    crc.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn incremental_matches_one_shot() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let whole = crc32(data);

        let mut incremental = Crc32::new();
        incremental.update(&data[..10]);
        incremental.update(&data[10..]);
        assert_eq!(incremental.finalize(), whole);
    }

    #[test]
    fn differs_from_ieee_polynomial() {
        // Sanity check that we didn't accidentally copy the IEEE table:
        // the well-known IEEE CRC32 of "123456789" is 0xCBF43926.
        assert_ne!(crc32(b"123456789"), 0xCBF4_3926);
    }

    proptest::proptest! {
        #[test]
        fn changing_any_byte_changes_the_checksum(data in proptest::collection::vec(proptest::prelude::any::<u8>(), 1..64), idx in 0usize..64, flip in 1u8..=255) {
            let idx = idx % data.len();
            let original = crc32(&data);
            let mut mutated = data.clone();
            mutated[idx] ^= flip;
            proptest::prop_assert_ne!(crc32(&mutated), original);
        }
    }
}
