//! Platform I/O shim (C1).
//!
//! Four primitives the data and index files build their durability policy
//! on: `preallocate`, `range_sync`, `flush`, and `advise` (dontneed). On
//! Linux these are real syscalls via `rustix`; everywhere else `preallocate`
//! and `advise` degrade to no-ops and `range_sync` degrades to a full
//! `flush`, mirroring the Linux/portable split the original store kept in
//! separate `io_linux`/`io_darwin` files.

use std::fs::File;

use crate::IoError;

/// Reserve physical space for `file` without necessarily changing its
/// logical size (`keep_size`), or extend the logical size to cover it.
#[cfg(target_os = "linux")]
pub fn preallocate(file: &File, offset: u64, length: u64, keep_size: bool) -> Result<(), IoError> {
    use rustix::fs::{fallocate, FallocateFlags};

    let mut flags = FallocateFlags::empty();
    if keep_size {
        flags |= FallocateFlags::KEEP_SIZE;
    }
    fallocate(file, flags, offset, length).map_err(std::io::Error::from)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
#[allow(unused_variables, clippy::unnecessary_wraps)]
pub fn preallocate(file: &File, offset: u64, length: u64, keep_size: bool) -> Result<(), IoError> {
    // No portable fallocate equivalent; the data/index files fall back to
    // relying on the filesystem to grow lazily on write.
    let _ = (file, offset, length, keep_size);
    Ok(())
}

/// Initiate write-back of a byte range without waiting for it to complete.
#[cfg(target_os = "linux")]
pub fn range_sync(file: &File, offset: u64, length: u64) -> Result<(), IoError> {
    use rustix::fs::{sync_file_range, SyncFileRangeFlags};

    sync_file_range(file, offset, length, SyncFileRangeFlags::WRITE)
        .map_err(std::io::Error::from)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn range_sync(file: &File, _offset: u64, _length: u64) -> Result<(), IoError> {
    // No range-limited write-back primitive; fold into a full data sync.
    file.sync_data()?;
    Ok(())
}

/// Block until file data (not metadata) is durable (`fdatasync`).
pub fn flush(file: &File) -> Result<(), IoError> {
    file.sync_data()?;
    Ok(())
}

/// Hint the OS to drop a byte range from its page cache.
#[cfg(target_os = "linux")]
pub fn advise_dontneed(file: &File, offset: u64, length: u64) -> Result<(), IoError> {
    use rustix::fs::{fadvise, Advice};

    fadvise(file, offset, length, Advice::DontNeed).map_err(std::io::Error::from)?;
    Ok(())
}

#[cfg(not(target_os = "linux"))]
#[allow(unused_variables, clippy::unnecessary_wraps)]
pub fn advise_dontneed(file: &File, offset: u64, length: u64) -> Result<(), IoError> {
    let _ = (file, offset, length);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flush_succeeds_on_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.dat");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello").unwrap();
        flush(&file).unwrap();
    }

    #[test]
    fn range_sync_succeeds_on_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.dat");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"hello").unwrap();
        range_sync(&file, 0, 5).unwrap();
    }

    #[test]
    fn advise_dontneed_succeeds_on_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.dat");
        let file = File::create(&path).unwrap();
        advise_dontneed(&file, 0, 0).unwrap();
    }

    #[test]
    fn preallocate_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.dat");
        let file = File::create(&path).unwrap();
        preallocate(&file, 0, 4096, true).unwrap();
    }
}
