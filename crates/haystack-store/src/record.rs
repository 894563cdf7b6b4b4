//! Needle record (C4): in-memory representation and on-disk byte layout of
//! a single stored object.
//!
//! ```text
//! | Header magic (4) | Cookie (4) | Key (8) | Flags (1) | Size (4) |
//! | Data (Size)       |
//! | Footer magic (4) | Checksum (4) |
//! | Padding (0..7)    |
//! ```
//!
//! `MTime` is tracked in memory (it is part of the essential Needle
//! attributes) but has no slot in the 21-byte header, so it does not
//! round-trip through `Serialize`/`Parse` — a needle read back from disk
//! always has `mtime == 0`.

use haystack_types::{Cookie, Key};

use crate::codec;
use crate::error::StoreError;

/// Fixed header size in bytes: magic(4) + cookie(4) + key(8) + flags(1) + size(4).
pub const HEADER_SIZE: u64 = 21;
/// Footer size before padding: magic(4) + checksum(4).
pub const FOOTER_BASE_SIZE: u64 = 8;
/// Alignment unit for on-disk records and the packed region's offset.
pub const NEEDLE_PADDING_SIZE: u64 = 8;
/// Largest payload size representable in the 24-bit `Size` field.
pub const MAX_SIZE: u64 = (1 << 24) - 1;

const HEADER_MAGIC: [u8; 4] = [0x14, 0x15, 0x92, 0x65];
const FOOTER_MAGIC: [u8; 4] = [0x35, 0x89, 0x79, 0x32];
const ZERO_PAD: [u8; 7] = [0; 7];

/// Bit 0 of `Flags`: needle is live.
pub const FLAG_OK: u8 = 0;
/// Bit 0 of `Flags`: needle is a tombstone.
pub const FLAG_DELETED: u8 = 1;

/// Rounds `n` up to the next multiple of 8.
pub fn align8(n: u64) -> u64 {
    (n + 7) & !7
}

/// `WriteSize` for a payload of `size` bytes: `align8(HeaderSize + size + FooterSize)`.
pub fn write_size(size: u32) -> u64 {
    align8(HEADER_SIZE + u64::from(size) + FOOTER_BASE_SIZE)
}

/// `AlignedSize` for a given `write_size`: `write_size / NeedlePaddingSize`.
pub fn aligned_size(write_size: u64) -> u64 {
    write_size / NEEDLE_PADDING_SIZE
}

/// A fully materialized needle: header fields plus its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Needle {
    pub key: Key,
    pub cookie: Cookie,
    pub mtime: i64,
    pub flags: u8,
    pub size: u32,
    pub data: Vec<u8>,
    pub checksum: u32,
}

impl Needle {
    /// `Size` after `PaddingSize` and header/footer are accounted for.
    pub fn write_size(&self) -> u64 {
        write_size(self.size)
    }

    pub fn is_deleted(&self) -> bool {
        self.flags & FLAG_DELETED != 0
    }

    /// Serializes this needle into `into[0..self.write_size()]`.
    pub fn serialize(&self, into: &mut [u8]) -> Result<(), StoreError> {
        let write_size = self.write_size() as usize;
        if into.len() != write_size {
            return Err(StoreError::BufferMismatch {
                expected: write_size,
                actual: into.len(),
            });
        }

        into[0..4].copy_from_slice(&HEADER_MAGIC);
        codec::put_i32(&mut into[4..8], self.cookie.as_i32())?;
        codec::put_i64(&mut into[8..16], self.key.as_i64())?;
        into[16] = self.flags;
        codec::put_u32(&mut into[17..21], self.size)?;

        let data_start = HEADER_SIZE as usize;
        let data_end = data_start + self.data.len();
        into[data_start..data_end].copy_from_slice(&self.data);

        let footer_start = data_end;
        into[footer_start..footer_start + 4].copy_from_slice(&FOOTER_MAGIC);
        codec::put_u32(&mut into[footer_start + 4..footer_start + 8], self.checksum)?;

        let padding_start = footer_start + FOOTER_BASE_SIZE as usize;
        let padding_len = into.len() - padding_start;
        into[padding_start..].copy_from_slice(&ZERO_PAD[..padding_len]);

        Ok(())
    }

    /// Parses a needle previously produced by [`Needle::serialize`] out of a
    /// buffer starting at its header. `offset` is only used to annotate a
    /// `BadNeedleMagic` error with where the corruption was found.
    pub fn parse(buf: &[u8], offset: u64) -> Result<Self, StoreError> {
        if buf.len() < HEADER_SIZE as usize {
            return Err(StoreError::BadNeedleMagic { offset });
        }
        if buf[0..4] != HEADER_MAGIC {
            return Err(StoreError::BadNeedleMagic { offset });
        }

        let cookie = Cookie::new(codec::get_i32(&buf[4..8])?);
        let key = Key::new(codec::get_i64(&buf[8..16])?);
        let flags = buf[16];
        let size = codec::get_u32(&buf[17..21])?;

        let data_start = HEADER_SIZE as usize;
        let data_end = data_start + size as usize;
        let footer_start = data_end;
        if buf.len() < footer_start + FOOTER_BASE_SIZE as usize {
            return Err(StoreError::BadNeedleMagic { offset });
        }
        if buf[footer_start..footer_start + 4] != FOOTER_MAGIC {
            return Err(StoreError::BadNeedleMagic {
                offset: offset + footer_start as u64,
            });
        }
        let checksum = codec::get_u32(&buf[footer_start + 4..footer_start + 8])?;
        let data = buf[data_start..data_end].to_vec();

        Ok(Self {
            key,
            cookie,
            mtime: 0,
            flags,
            size,
            data,
            checksum,
        })
    }

    /// Verifies the stored checksum against the actual payload bytes.
    pub fn verify_checksum(&self) -> bool {
        haystack_crypto::crc32(&self.data) == self.checksum
    }
}

/// Staged needle metadata produced by [`build`], awaiting its payload.
pub struct NeedleBuilder {
    key: Key,
    cookie: Cookie,
    mtime: i64,
    size: u32,
    flags: u8,
}

/// `Build(key, cookie, size)`: validates `size` fits the 24-bit field and
/// stages header fields without allocating a payload buffer yet.
pub fn build(key: Key, cookie: Cookie, size: u32, mtime: i64) -> Result<NeedleBuilder, StoreError> {
    if u64::from(size) > MAX_SIZE {
        return Err(StoreError::SizeOverflow {
            size: u64::from(size),
            max: MAX_SIZE,
        });
    }
    Ok(NeedleBuilder {
        key,
        cookie,
        mtime,
        size,
        flags: FLAG_OK,
    })
}

impl NeedleBuilder {
    /// Marks the staged needle as a tombstone (`DeleteNeedle`).
    pub fn deleted(mut self) -> Self {
        self.flags |= FLAG_DELETED;
        self
    }

    /// `ReadPayload(source)`: consumes exactly `size` bytes from `source`
    /// into a newly allocated payload and computes its checksum.
    pub fn read_payload(self, source: &[u8]) -> Result<Needle, StoreError> {
        if source.len() != self.size as usize {
            return Err(StoreError::BufferMismatch {
                expected: self.size as usize,
                actual: source.len(),
            });
        }
        let data = source.to_vec();
        let checksum = haystack_crypto::crc32(&data);
        Ok(Needle {
            key: self.key,
            cookie: self.cookie,
            mtime: self.mtime,
            flags: self.flags,
            size: self.size,
            data,
            checksum,
        })
    }
}
