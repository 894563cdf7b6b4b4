//! Data file (C5): the append-only byte log of serialized needles.

use std::path::{Path, PathBuf};

use haystack_io::{FileHandle, OpenFlags, SyncBackend};
use haystack_types::{Key, NeedleRegion, VolumeId};

use crate::buffer_pool::BufferPool;
use crate::error::StoreError;
use crate::record::{self, Needle, NEEDLE_PADDING_SIZE};
use crate::superblock;

/// Flush cadence: how many appends accumulate before the flush policy
/// actually runs. `1` means "flush on every append".
pub const DATA_FILE_MAX_CACHE_WRITE: u64 = 1;

/// Upper bound on a data file's size: `2^40 * NeedlePaddingSize` bytes, the
/// largest offset a 40-bit `AlignedOffset` can address.
pub const DATA_FILE_MAX_SIZE: u64 = (1u64 << 40) * NEEDLE_PADDING_SIZE;

/// Append-only log of needles for one volume, preceded by one superblock.
pub struct DataFile {
    vid: VolumeId,
    backend: SyncBackend,
    handle: FileHandle,
    file_size: u64,
    synced_size: u64,
    aligned_offset: u64,
    cache_writed: u64,
    pool: BufferPool,
}

impl DataFile {
    fn path(dir: &Path, vid: VolumeId) -> PathBuf {
        dir.join(format!("{}.dat", vid.as_i32()))
    }

    /// Opens (creating if absent) `<dir>/<vid>.dat`.
    pub fn open(dir: &Path, vid: VolumeId) -> Result<Self, StoreError> {
        let path = Self::path(dir, vid);
        let backend = SyncBackend::new();
        let mut handle = backend.open(&path, OpenFlags::append_create())?;
        let existing_size = backend.file_size(&handle)?;

        let (file_size, synced_size, aligned_offset) = if existing_size == 0 {
            backend.preallocate(&handle, 0, DATA_FILE_MAX_SIZE, true)?;
            let sb = superblock::build();
            backend.write(&mut handle, &sb)?;
            backend.fsync(&handle)?;
            let size = superblock::SUPER_BLOCK_SIZE;
            (size, size, size / NEEDLE_PADDING_SIZE)
        } else {
            let mut sb = [0u8; superblock::SUPER_BLOCK_SIZE as usize];
            backend.read_at(&handle, 0, &mut sb)?;
            superblock::validate(&sb, &path)?;
            (
                existing_size,
                existing_size,
                existing_size / NEEDLE_PADDING_SIZE,
            )
        };

        Ok(Self {
            vid,
            backend,
            handle,
            file_size,
            synced_size,
            aligned_offset,
            cache_writed: 0,
            pool: BufferPool::default(),
        })
    }

    /// Current logical size of the file, in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Appends a needle, returning the region it was written to.
    pub fn append_needle(&mut self, needle: &Needle) -> Result<NeedleRegion, StoreError> {
        let write_size = needle.write_size();
        if self.file_size + write_size > DATA_FILE_MAX_SIZE {
            return Err(StoreError::NoSpaceData {
                vid: self.vid.as_i32(),
                write_size,
            });
        }

        let mut buf = self.pool.acquire(write_size as usize);
        needle.serialize(&mut buf)?;
        self.backend.write(&mut self.handle, &buf)?;

        let region = NeedleRegion::new(self.aligned_offset, write_size as u32);
        self.aligned_offset += record::aligned_size(write_size);
        self.file_size += write_size;

        if let Err(err) = self.flush_file(false) {
            self.aligned_offset -= record::aligned_size(write_size);
            self.file_size -= write_size;
            return Err(err);
        }

        Ok(region)
    }

    /// Reads and parses the needle located at `region`.
    ///
    /// `key` is accepted for parity with the operation interface; this
    /// implementation trusts the index to have resolved the right region
    /// and does not cross-check `key` against the parsed needle.
    pub fn get_needle(&self, _key: Key, region: &NeedleRegion) -> Result<Needle, StoreError> {
        let offset = region.byte_offset(NEEDLE_PADDING_SIZE);
        let mut buf = vec![0u8; region.size as usize];
        self.backend.read_exact_at(&self.handle, offset, &mut buf)?;
        Needle::parse(&buf, offset)
    }

    fn flush_file(&mut self, force: bool) -> Result<(), StoreError> {
        self.cache_writed += 1;
        if !force && self.cache_writed < DATA_FILE_MAX_CACHE_WRITE {
            return Ok(());
        }
        self.cache_writed = 0;

        let offset = self.synced_size;
        let length = self.file_size - offset;
        if length == 0 {
            return Ok(());
        }

        self.backend.range_sync(&self.handle, offset, length)?;
        self.backend.fsync(&self.handle)?;

        match self.backend.advise_dontneed(&self.handle, offset, length) {
            Ok(()) => self.synced_size = self.file_size,
            Err(err) => {
                tracing::warn!(
                    vid = self.vid.as_i32(),
                    %err,
                    "advise(DONTNEED) failed after a durable write; cache hint was not applied"
                );
            }
        }
        Ok(())
    }

    /// Closes the underlying file handle, consuming `self`.
    pub fn close(self) -> Result<(), StoreError> {
        self.backend.close(self.handle)?;
        Ok(())
    }
}
