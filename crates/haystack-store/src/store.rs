//! Store (C8): a directory that owns a `vid -> Volume` mapping, discovered
//! by scanning for `.dat` files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use haystack_types::VolumeId;

use crate::error::StoreError;
use crate::volume::Volume;

/// Directory of volumes, keyed by volume id.
pub struct Store {
    dir: PathBuf,
    volumes: HashMap<VolumeId, Volume>,
}

impl Store {
    /// Ensures `dir` exists, then discovers and initializes every volume
    /// whose data file (`<vid>.dat`) is present. A volume that fails to
    /// initialize aborts the whole open (all-or-nothing).
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|source| haystack_io::IoError::Io { source })?;

        let mut volumes = HashMap::new();
        let entries = std::fs::read_dir(dir).map_err(|source| haystack_io::IoError::Io { source })?;
        for entry in entries {
            let entry = entry.map_err(|source| haystack_io::IoError::Io { source })?;
            let path = entry.path();
            let Some(vid) = parse_vid(&path) else {
                continue;
            };
            let volume = Volume::init(dir, vid)?;
            volumes.insert(vid, volume);
        }

        tracing::info!(dir = %dir.display(), volumes = volumes.len(), "store opened");
        Ok(Self {
            dir: dir.to_path_buf(),
            volumes,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Looks up an already-open volume. Absence is not an error.
    pub fn get_volume(&self, vid: VolumeId) -> Option<&Volume> {
        self.volumes.get(&vid)
    }

    /// Initializes a new volume and inserts it. On failure nothing is
    /// inserted.
    pub fn create_volume(&mut self, vid: VolumeId) -> Result<&Volume, StoreError> {
        let volume = Volume::init(&self.dir, vid)?;
        Ok(self.volumes.entry(vid).or_insert(volume))
    }

    /// Closes every volume and clears the map.
    pub fn close(&mut self) -> Result<(), StoreError> {
        let mut first_err = None;
        for (_, volume) in self.volumes.drain() {
            if let Err(err) = volume.close() {
                first_err.get_or_insert(err);
            }
        }
        tracing::info!(dir = %self.dir.display(), "store closed");
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn parse_vid(path: &Path) -> Option<VolumeId> {
    if path.extension().and_then(|e| e.to_str()) != Some("dat") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    stem.parse::<i32>().ok().map(VolumeId::new)
}
