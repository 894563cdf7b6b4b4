//! # haystack-store: the needle storage engine
//!
//! The core components of a Haystack-style append-only blob store, leaves
//! first: a binary codec, a superblock, the needle record format, the data
//! file, the index file and its in-memory map, the volume that couples
//! them under a single read-write lock, and the store that discovers
//! volumes in a directory.

pub mod buffer_pool;
pub mod codec;
pub mod data;
mod error;
mod index;
pub mod record;
pub mod store;
pub mod superblock;
pub mod volume;

pub use data::DataFile;
pub use error::StoreError;
pub use index::IndexFile;
pub use record::Needle;
pub use store::Store;
pub use volume::{Metrics, Volume};
