//! Volume (C7): couples one data file and one index file behind a single
//! read-write lock, exposing write/read/delete of a needle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

use haystack_types::{Cookie, Key, VolumeId};

use crate::data::DataFile;
use crate::error::StoreError;
use crate::index::IndexFile;
use crate::record::{self, Needle};

/// Per-volume read/write/delete counters (bytes and elapsed nanoseconds),
/// tracked independently of the volume's rwlock via atomic fetch-add.
#[derive(Debug, Default)]
pub struct Metrics {
    pub read_count: AtomicU64,
    pub read_bytes: AtomicU64,
    pub read_time_ns: AtomicU64,
    pub write_count: AtomicU64,
    pub write_bytes: AtomicU64,
    pub write_time_ns: AtomicU64,
    pub delete_count: AtomicU64,
    pub delete_bytes: AtomicU64,
    pub delete_time_ns: AtomicU64,
}

impl Metrics {
    fn record_write(&self, bytes: u64, elapsed: std::time::Duration) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.write_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.write_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    fn record_read(&self, bytes: u64, elapsed: std::time::Duration) {
        self.read_count.fetch_add(1, Ordering::Relaxed);
        self.read_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.read_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }

    fn record_delete(&self, bytes: u64, elapsed: std::time::Duration) {
        self.delete_count.fetch_add(1, Ordering::Relaxed);
        self.delete_bytes.fetch_add(bytes, Ordering::Relaxed);
        self.delete_time_ns
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
    }
}

struct Files {
    data: DataFile,
    index: IndexFile,
}

/// State machine: `Closed -> Initialized/Open -> Closed`. `Init` opens both
/// underlying files; any failure leaves the volume closed.
pub struct Volume {
    vid: VolumeId,
    dir: PathBuf,
    files: RwLock<Option<Files>>,
    metrics: Metrics,
}

impl Volume {
    /// Opens (or creates) the volume's data and index files in `dir`.
    pub fn init(dir: &Path, vid: VolumeId) -> Result<Self, StoreError> {
        let data = DataFile::open(dir, vid)?;
        let index = IndexFile::open(dir, vid)?;
        tracing::info!(vid = vid.as_i32(), dir = %dir.display(), "volume initialized");
        Ok(Self {
            vid,
            dir: dir.to_path_buf(),
            files: RwLock::new(Some(Files { data, index })),
            metrics: Metrics::default(),
        })
    }

    pub fn vid(&self) -> VolumeId {
        self.vid
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Writes `data` under `key`/`cookie`. A later write to the same key
    /// supersedes the prior one; the old region is counted as outdated.
    pub fn write_needle(&self, key: Key, cookie: Cookie, data: &[u8]) -> Result<(), StoreError> {
        let start = Instant::now();
        let mut guard = self.files.write().unwrap_or_else(|p| p.into_inner());
        let files = guard.as_mut().ok_or(StoreError::ClosedVolume {
            vid: self.vid.as_i32(),
        })?;

        let needle = record::build(key, cookie, data.len() as u32, now_unix_seconds())?
            .read_payload(data)?;

        let region = files.data.append_needle(&needle)?;
        files.index.append_index_entry(key, region)?;

        self.metrics.record_write(region.size.into(), start.elapsed());
        Ok(())
    }

    /// Reads the live needle stored under `key`.
    pub fn read_needle(&self, key: Key) -> Result<Needle, StoreError> {
        let start = Instant::now();
        let guard = self.files.read().unwrap_or_else(|p| p.into_inner());
        let files = guard.as_ref().ok_or(StoreError::ClosedVolume {
            vid: self.vid.as_i32(),
        })?;

        let region = files
            .index
            .get_needle_region(key)
            .ok_or(StoreError::NeedleNotFound { key: key.as_i64() })?;
        let needle = files.data.get_needle(key, &region)?;

        if needle.is_deleted() {
            return Err(StoreError::NeedleNotFound { key: key.as_i64() });
        }

        self.metrics
            .record_read(u64::from(needle.size), start.elapsed());
        Ok(needle)
    }

    /// Writes a tombstone needle for `key` (`Size = 0`, deleted flag set).
    /// Readers see the key as not-present afterward.
    pub fn delete_needle(&self, key: Key, cookie: Cookie) -> Result<(), StoreError> {
        let start = Instant::now();
        let mut guard = self.files.write().unwrap_or_else(|p| p.into_inner());
        let files = guard.as_mut().ok_or(StoreError::ClosedVolume {
            vid: self.vid.as_i32(),
        })?;

        let needle = record::build(key, cookie, 0, now_unix_seconds())?
            .deleted()
            .read_payload(&[])?;

        let region = files.data.append_needle(&needle)?;
        files.index.append_index_entry(key, region)?;

        self.metrics.record_delete(0, start.elapsed());
        Ok(())
    }

    /// Sum of `region.Size` over every index entry ever appended.
    pub fn total_size(&self) -> Result<u64, StoreError> {
        let guard = self.files.read().unwrap_or_else(|p| p.into_inner());
        let files = guard.as_ref().ok_or(StoreError::ClosedVolume {
            vid: self.vid.as_i32(),
        })?;
        Ok(files.index.total_size())
    }

    /// Count of index entries superseded by a later write to the same key.
    pub fn outdated_keys(&self) -> Result<u64, StoreError> {
        let guard = self.files.read().unwrap_or_else(|p| p.into_inner());
        let files = guard.as_ref().ok_or(StoreError::ClosedVolume {
            vid: self.vid.as_i32(),
        })?;
        Ok(files.index.outdated_keys())
    }

    /// Sum of the sizes of superseded regions.
    pub fn outdated_size(&self) -> Result<u64, StoreError> {
        let guard = self.files.read().unwrap_or_else(|p| p.into_inner());
        let files = guard.as_ref().ok_or(StoreError::ClosedVolume {
            vid: self.vid.as_i32(),
        })?;
        Ok(files.index.outdated_size())
    }

    /// Idempotently closes both underlying files. Operations attempted
    /// afterward fail with `ClosedVolume`.
    pub fn close(&self) -> Result<(), StoreError> {
        let mut guard = self.files.write().unwrap_or_else(|p| p.into_inner());
        if let Some(files) = guard.take() {
            let data_result = files.data.close();
            let index_result = files.index.close();
            tracing::info!(vid = self.vid.as_i32(), "volume closed");
            data_result?;
            index_result?;
        }
        Ok(())
    }
}

fn now_unix_seconds() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_write_then_read_hello() {
        let dir = tempfile::tempdir().unwrap();
        let volume = Volume::init(dir.path(), VolumeId::new(7)).unwrap();
        volume
            .write_needle(Key::new(42), Cookie::new(1), b"hello")
            .unwrap();

        let needle = volume.read_needle(Key::new(42)).unwrap();
        assert_eq!(needle.data, b"hello");
    }

    #[test]
    fn scenario_overwrite_counts_outdated_and_returns_latest() {
        let dir = tempfile::tempdir().unwrap();
        let volume = Volume::init(dir.path(), VolumeId::new(7)).unwrap();
        volume
            .write_needle(Key::new(42), Cookie::new(1), b"hello")
            .unwrap();
        volume
            .write_needle(Key::new(42), Cookie::new(2), b"world!")
            .unwrap();

        let needle = volume.read_needle(Key::new(42)).unwrap();
        assert_eq!(needle.data, b"world!");
        assert_eq!(needle.cookie.as_i32(), 2);
        assert_eq!(volume.outdated_keys().unwrap(), 1);
        assert_eq!(volume.outdated_size().unwrap(), 40);
    }

    #[test]
    fn scenario_close_then_reopen_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let volume = Volume::init(dir.path(), VolumeId::new(7)).unwrap();
            volume
                .write_needle(Key::new(42), Cookie::new(1), b"hello")
                .unwrap();
            volume
                .write_needle(Key::new(42), Cookie::new(2), b"world!")
                .unwrap();
            volume.close().unwrap();
        }

        let volume = Volume::init(dir.path(), VolumeId::new(7)).unwrap();
        let needle = volume.read_needle(Key::new(42)).unwrap();
        assert_eq!(needle.data, b"world!");
        assert_eq!(volume.total_size().unwrap(), 80);
        assert_eq!(volume.outdated_keys().unwrap(), 1);
    }

    #[test]
    fn read_of_unknown_key_is_needle_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let volume = Volume::init(dir.path(), VolumeId::new(7)).unwrap();
        let err = volume.read_needle(Key::new(999)).unwrap_err();
        assert!(matches!(err, StoreError::NeedleNotFound { key: 999 }));
    }

    #[test]
    fn deleted_needle_reads_as_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let volume = Volume::init(dir.path(), VolumeId::new(7)).unwrap();
        volume
            .write_needle(Key::new(42), Cookie::new(1), b"hello")
            .unwrap();
        volume.delete_needle(Key::new(42), Cookie::new(1)).unwrap();

        let err = volume.read_needle(Key::new(42)).unwrap_err();
        assert!(matches!(err, StoreError::NeedleNotFound { .. }));
    }

    #[test]
    fn operations_after_close_fail_with_closed_volume() {
        let dir = tempfile::tempdir().unwrap();
        let volume = Volume::init(dir.path(), VolumeId::new(7)).unwrap();
        volume.close().unwrap();
        volume.close().unwrap(); // idempotent

        let err = volume
            .write_needle(Key::new(1), Cookie::new(1), b"x")
            .unwrap_err();
        assert!(matches!(err, StoreError::ClosedVolume { .. }));
    }

    #[test]
    fn metrics_track_write_and_read_counts() {
        let dir = tempfile::tempdir().unwrap();
        let volume = Volume::init(dir.path(), VolumeId::new(7)).unwrap();
        volume
            .write_needle(Key::new(42), Cookie::new(1), b"hello")
            .unwrap();
        volume.read_needle(Key::new(42)).unwrap();

        assert_eq!(volume.metrics().write_count.load(Ordering::Relaxed), 1);
        assert_eq!(volume.metrics().read_count.load(Ordering::Relaxed), 1);
    }
}
