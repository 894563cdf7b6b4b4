//! SuperBlock (C3): the 8-byte header shared by the data and index files.

use std::path::Path;

use crate::error::StoreError;

/// Size in bytes of the superblock (magic + version + padding).
pub const SUPER_BLOCK_SIZE: u64 = 8;

const MAGIC: [u8; 4] = [0x83, 0x84, 0x77, 0x55];
const VERSION: u8 = 1;

/// Serializes a fresh superblock into an 8-byte buffer.
pub fn build() -> [u8; SUPER_BLOCK_SIZE as usize] {
    let mut buf = [0u8; SUPER_BLOCK_SIZE as usize];
    buf[0..4].copy_from_slice(&MAGIC);
    buf[4] = VERSION;
    // buf[5..8] stays zero padding.
    buf
}

/// Validates an 8-byte buffer read from offset 0 of `path`.
///
/// Fails with [`StoreError::BadSuperBlock`] on magic or version mismatch.
pub fn validate(buf: &[u8], path: &Path) -> Result<(), StoreError> {
    let bad = || StoreError::BadSuperBlock {
        path: path.to_path_buf(),
    };
    if buf.len() < SUPER_BLOCK_SIZE as usize {
        return Err(bad());
    }
    if buf[0..4] != MAGIC {
        return Err(bad());
    }
    if buf[4] != VERSION {
        return Err(bad());
    }
    Ok(())
}
