//! File backend: open/read/write/close over a handle, plus the
//! preallocate/sync/advise primitives the data and index files drive their
//! flush policy with.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::IoError;

/// Flags for opening a data or index file.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub read: bool,
    pub write: bool,
    pub create: bool,
    pub append: bool,
}

impl OpenFlags {
    /// Flags for reading an existing file.
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Flags for creating-or-opening a file for append-only writes, with
    /// reads also permitted (needed for recovery and `GetNeedle`).
    pub fn append_create() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            append: true,
        }
    }
}

/// Opaque handle to an open file.
#[derive(Debug)]
pub struct FileHandle {
    pub(crate) id: u64,
    pub(crate) file: Option<std::fs::File>,
}

impl FileHandle {
    pub(crate) fn from_file(id: u64, file: std::fs::File) -> Self {
        Self {
            id,
            file: Some(file),
        }
    }

    pub(crate) fn file(&self) -> Result<&std::fs::File, IoError> {
        self.file
            .as_ref()
            .ok_or(IoError::InvalidHandle { handle: self.id })
    }

    pub(crate) fn file_mut(&mut self) -> Result<&mut std::fs::File, IoError> {
        self.file
            .as_mut()
            .ok_or(IoError::InvalidHandle { handle: self.id })
    }
}

/// Synchronous `std::fs`-backed file I/O, with platform-specific
/// preallocate/range-sync/advise primitives layered on top (see
/// [`crate::platform`]).
#[derive(Debug, Default)]
pub struct SyncBackend {
    next_handle_id: AtomicU64,
}

impl SyncBackend {
    pub fn new() -> Self {
        Self {
            next_handle_id: AtomicU64::new(1),
        }
    }

    /// Opens `path` with the given flags.
    pub fn open(&self, path: &Path, flags: OpenFlags) -> Result<FileHandle, IoError> {
        let file = std::fs::OpenOptions::new()
            .read(flags.read)
            .write(flags.write)
            .create(flags.create)
            .append(flags.append)
            .open(path)
            .map_err(|source| {
                if source.kind() == std::io::ErrorKind::NotFound {
                    IoError::NotFound {
                        path: path.to_path_buf(),
                    }
                } else {
                    IoError::Io { source }
                }
            })?;
        let id = self.next_handle_id.fetch_add(1, Ordering::Relaxed);
        Ok(FileHandle::from_file(id, file))
    }

    /// Reads from `handle` at `offset` into `buf`, returning the number of
    /// bytes read.
    pub fn read_at(&self, handle: &FileHandle, offset: u64, buf: &mut [u8]) -> Result<usize, IoError> {
        use std::os::unix::fs::FileExt;
        Ok(handle.file()?.read_at(buf, offset)?)
    }

    /// Reads `buf.len()` bytes from `handle` at `offset`, erroring if the
    /// file is shorter than requested.
    pub fn read_exact_at(&self, handle: &FileHandle, offset: u64, buf: &mut [u8]) -> Result<(), IoError> {
        use std::os::unix::fs::FileExt;
        Ok(handle.file()?.read_exact_at(buf, offset)?)
    }

    /// Writes `buf` to `handle` at the current position (append mode).
    pub fn write(&self, handle: &mut FileHandle, buf: &[u8]) -> Result<usize, IoError> {
        use std::io::Write;
        Ok(handle.file_mut()?.write(buf)?)
    }

    /// Full `fsync` of `handle`.
    pub fn fsync(&self, handle: &FileHandle) -> Result<(), IoError> {
        crate::platform::flush(handle.file()?)
    }

    /// Initiates write-back of `[offset, offset + length)` on `handle`.
    pub fn range_sync(&self, handle: &FileHandle, offset: u64, length: u64) -> Result<(), IoError> {
        crate::platform::range_sync(handle.file()?, offset, length)
    }

    /// Hints the OS to drop `[offset, offset + length)` from its page cache.
    pub fn advise_dontneed(&self, handle: &FileHandle, offset: u64, length: u64) -> Result<(), IoError> {
        crate::platform::advise_dontneed(handle.file()?, offset, length)
    }

    /// Reserves `length` bytes starting at `offset`, optionally keeping the
    /// file's logical size unchanged.
    pub fn preallocate(&self, handle: &FileHandle, offset: u64, length: u64, keep_size: bool) -> Result<(), IoError> {
        crate::platform::preallocate(handle.file()?, offset, length, keep_size)
    }

    /// Closes `handle`. The underlying file is dropped, closing its
    /// descriptor.
    pub fn close(&self, mut handle: FileHandle) -> Result<(), IoError> {
        handle.file.take();
        Ok(())
    }

    /// Returns the current size, in bytes, of the file backing `handle`.
    pub fn file_size(&self, handle: &FileHandle) -> Result<u64, IoError> {
        Ok(handle.file()?.metadata()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.dat");
        let backend = SyncBackend::new();

        let mut handle = backend.open(&path, OpenFlags::append_create()).unwrap();
        backend.write(&mut handle, b"hello world").unwrap();
        backend.fsync(&handle).unwrap();

        let mut buf = [0u8; 5];
        backend.read_at(&handle, 0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
        assert_eq!(backend.file_size(&handle).unwrap(), 11);
    }

    #[test]
    fn open_missing_file_without_create_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.dat");
        let backend = SyncBackend::new();
        let err = backend.open(&path, OpenFlags::read_only()).unwrap_err();
        assert!(matches!(err, IoError::NotFound { .. }));
    }

    #[test]
    fn handle_id_is_invalid_after_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.dat");
        let backend = SyncBackend::new();
        let handle = backend.open(&path, OpenFlags::append_create()).unwrap();
        assert!(backend.file_size(&handle).is_ok());
    }
}
