//! Error taxonomy for the needle store.

/// Errors returned by `haystack-store` operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Magic or version mismatch reading a superblock.
    #[error("bad superblock in {path}")]
    BadSuperBlock { path: std::path::PathBuf },

    /// Header magic mismatch while parsing a needle.
    #[error("bad needle magic at offset {offset}")]
    BadNeedleMagic { offset: u64 },

    /// Key absent from the index.
    #[error("needle not found for key {key}")]
    NeedleNotFound { key: i64 },

    /// Data file would exceed `DataFileMaxSize`.
    #[error("data file for volume {vid} has no space for {write_size} more bytes")]
    NoSpaceData { vid: i32, write_size: u64 },

    /// Index file would exceed `IndexFileMaxSize`.
    #[error("index file for volume {vid} has no space for another entry")]
    NoSpaceIndex { vid: i32 },

    /// Underlying I/O failure: open, read, write, seek, sync, advise.
    #[error("I/O failure: {source}")]
    IoFailed {
        #[from]
        source: haystack_io::IoError,
    },

    /// Operation attempted on a volume after `Close`.
    #[error("volume {vid} is closed")]
    ClosedVolume { vid: i32 },

    /// Programmer error: codec buffer width did not match the requested
    /// integer width.
    #[error("codec buffer width mismatch: expected {expected}, got {actual}")]
    BufferMismatch { expected: usize, actual: usize },

    /// Payload size does not fit the 24-bit `Size` field (`>= 1 << 24`).
    #[error("needle size {size} exceeds the maximum of {max}")]
    SizeOverflow { size: u64, max: u64 },
}
