//! # haystack
//!
//! A Haystack-style append-only blob store for very large numbers of small
//! immutable objects, offering a constant number of disk seeks per read.
//!
//! This crate is a thin facade over [`haystack_store`]: it re-exports the
//! operation interface external collaborators (an HTTP surface, a CLI, a
//! cluster/consensus layer) drive the core through, and adds no behavior of
//! its own. Those collaborators are out of scope for this crate.
//!
//! ```no_run
//! use haystack::{Cookie, Key, Store, VolumeId};
//!
//! # fn main() -> Result<(), haystack::StoreError> {
//! let mut store = Store::open(std::path::Path::new("/tmp/haystack"))?;
//! let volume = store.create_volume(VolumeId::new(7))?;
//! volume.write_needle(Key::new(42), Cookie::new(1), b"hello")?;
//! let needle = volume.read_needle(Key::new(42))?;
//! assert_eq!(needle.data, b"hello");
//! store.close()?;
//! # Ok(())
//! # }
//! ```

pub use haystack_store::{Metrics, Needle, Store, StoreError, Volume};
pub use haystack_types::{Cookie, Key, NeedleRegion, VolumeId};

#[cfg(test)]
mod tests;
