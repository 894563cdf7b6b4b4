//! Index file + in-memory map (C6).
//!
//! An append-only log of `(key, packed region)` entries backs an in-memory
//! `HashMap<Key, u64>` that is authoritative for lookups; the log exists
//! purely so the map can be rebuilt (`loadIndices`) after a restart.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use haystack_io::{FileHandle, OpenFlags, SyncBackend};
use haystack_types::{Key, NeedleRegion, VolumeId};

use crate::error::StoreError;
use crate::superblock;

/// On-disk width of one index record: `key(8 BE)` ‖ `packed_region(8 BE)`.
pub const INDEX_ENTRY_SIZE: u64 = 16;

/// Upper bound on an index file's size: `16 * 32 * 2^20` bytes (≈536 MiB),
/// bounding a volume to ≈33.5M entries.
pub const INDEX_FILE_MAX_SIZE: u64 = 16 * 32 * (1 << 20);

/// Flush cadence for index appends, matching the data file's policy.
pub const INDEX_FILE_MAX_CACHE_WRITE: u64 = 1;

/// Append-only `(key, region)` log plus the in-memory map it backs.
pub struct IndexFile {
    vid: VolumeId,
    backend: SyncBackend,
    handle: FileHandle,
    file_size: u64,
    synced_size: u64,
    cache_writed: u64,
    map: HashMap<Key, u64>,
    total_size: u64,
    outdated_keys: AtomicU64,
    outdated_size: AtomicU64,
}

impl IndexFile {
    fn path(dir: &Path, vid: VolumeId) -> PathBuf {
        dir.join(format!("{}.idx", vid.as_i32()))
    }

    /// Opens (creating if absent) `<dir>/<vid>.idx` and replays it into the
    /// in-memory map.
    pub fn open(dir: &Path, vid: VolumeId) -> Result<Self, StoreError> {
        let path = Self::path(dir, vid);
        let backend = SyncBackend::new();
        let mut handle = backend.open(&path, OpenFlags::append_create())?;
        let existing_size = backend.file_size(&handle)?;

        let file_size = if existing_size == 0 {
            backend.preallocate(&handle, 0, INDEX_FILE_MAX_SIZE, true)?;
            let sb = superblock::build();
            backend.write(&mut handle, &sb)?;
            backend.fsync(&handle)?;
            superblock::SUPER_BLOCK_SIZE
        } else {
            let mut sb = [0u8; superblock::SUPER_BLOCK_SIZE as usize];
            backend.read_at(&handle, 0, &mut sb)?;
            superblock::validate(&sb, &path)?;
            existing_size
        };

        let mut index = Self {
            vid,
            backend,
            handle,
            file_size,
            synced_size: file_size,
            cache_writed: 0,
            map: HashMap::new(),
            total_size: 0,
            outdated_keys: AtomicU64::new(0),
            outdated_size: AtomicU64::new(0),
        };
        index.load_indices()?;
        Ok(index)
    }

    /// Replays every complete 16-byte record from `SuperBlockSize` onward
    /// into the in-memory map. A short trailing record (a torn write) is
    /// tolerated and ignored.
    fn load_indices(&mut self) -> Result<(), StoreError> {
        let mut offset = superblock::SUPER_BLOCK_SIZE;
        let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
        while offset + INDEX_ENTRY_SIZE <= self.file_size {
            let read = self.backend.read_at(&self.handle, offset, &mut buf)?;
            if read < INDEX_ENTRY_SIZE as usize {
                break;
            }
            let key = Key::new(crate::codec::get_i64(&buf[0..8])?);
            let packed = crate::codec::get_u64(&buf[8..16])?;
            let region = NeedleRegion::decode(packed);
            self.total_size += u64::from(region.size);
            self.set_needle_region(key, region);
            offset += INDEX_ENTRY_SIZE;
        }
        Ok(())
    }

    /// Replaces (or inserts) the region for `key`. If a previous region
    /// existed, it is counted as outdated.
    pub fn set_needle_region(&mut self, key: Key, region: NeedleRegion) {
        let previous = self.map.insert(key, region.encode());
        if let Some(previous) = previous {
            let previous = NeedleRegion::decode(previous);
            self.outdated_keys.fetch_add(1, Ordering::Relaxed);
            self.outdated_size
                .fetch_add(u64::from(previous.size), Ordering::Relaxed);
        }
    }

    /// Looks up the region for `key`. Absence is not an error at this layer.
    pub fn get_needle_region(&self, key: Key) -> Option<NeedleRegion> {
        self.map.get(&key).copied().map(NeedleRegion::decode)
    }

    /// Appends a `(key, region)` entry to the log and updates the map.
    pub fn append_index_entry(&mut self, key: Key, region: NeedleRegion) -> Result<(), StoreError> {
        if self.file_size + INDEX_ENTRY_SIZE > INDEX_FILE_MAX_SIZE {
            return Err(StoreError::NoSpaceIndex {
                vid: self.vid.as_i32(),
            });
        }

        let mut buf = [0u8; INDEX_ENTRY_SIZE as usize];
        crate::codec::put_i64(&mut buf[0..8], key.as_i64())?;
        crate::codec::put_u64(&mut buf[8..16], region.encode())?;

        self.backend.write(&mut self.handle, &buf)?;
        self.file_size += INDEX_ENTRY_SIZE;

        if let Err(err) = self.flush_file(false) {
            self.file_size -= INDEX_ENTRY_SIZE;
            return Err(err);
        }

        self.total_size += u64::from(region.size);
        self.set_needle_region(key, region);
        Ok(())
    }

    fn flush_file(&mut self, force: bool) -> Result<(), StoreError> {
        self.cache_writed += 1;
        if !force && self.cache_writed < INDEX_FILE_MAX_CACHE_WRITE {
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
                    "advise(DONTNEED) failed after a durable index write"
                );
            }
        }
        Ok(())
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn outdated_keys(&self) -> u64 {
        self.outdated_keys.load(Ordering::Relaxed)
    }

    pub fn outdated_size(&self) -> u64 {
        self.outdated_size.load(Ordering::Relaxed)
    }

    pub fn live_keys(&self) -> u64 {
        self.map.len() as u64
    }

    /// `outdatedKeys / (outdatedKeys + liveKeys)`, for observability.
    pub fn outdated_keys_rate(&self) -> f64 {
        let outdated = self.outdated_keys() as f64;
        let live = self.live_keys() as f64;
        if outdated + live == 0.0 {
            0.0
        } else {
            outdated / (outdated + live)
        }
    }

    /// `outdatedSize / totalSize`, for observability.
    pub fn outdated_size_rate(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            self.outdated_size() as f64 / self.total_size as f64
        }
    }

    pub fn close(self) -> Result<(), StoreError> {
        self.backend.close(self.handle)?;
        Ok(())
    }
}
