//! I/O error types.

use std::path::PathBuf;

/// Errors from the platform I/O shim and file backend.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Underlying OS I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// File not found.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid or already-closed file handle.
    #[error("invalid file handle: {handle}")]
    InvalidHandle { handle: u64 },
}
