//! Persisted index snapshot: passages and their vectors as one `rkyv` archive.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use memmap2::Mmap;
use rkyv::rancor::Error as RkyvError;
use rkyv::{Archive, Deserialize, Serialize};
use tempfile::NamedTempFile;

use super::error::IndexError;
use crate::corpus::Passage;

#[derive(Archive, Deserialize, Serialize, Debug, PartialEq, Clone)]
pub struct IndexSnapshot {
    /// Prefix fingerprint the snapshot was built for.
    pub fingerprint: String,
    /// Digest over the full passage contents.
    pub content_digest: String,
    /// Unix timestamp (seconds) of the build.
    pub created_at: i64,
    pub dimension: u32,
    pub passages: Vec<Passage>,
    /// One vector per passage, same order.
    pub vectors: Vec<Vec<f32>>,
}

impl IndexSnapshot {
    /// Writes the archive to a temp file in the same directory, then renames it over `path`.
    pub fn write_atomic(&self, path: &Path) -> Result<(), IndexError> {
        let bytes = rkyv::to_bytes::<RkyvError>(self).map_err(|e| IndexError::Snapshot {
            reason: format!("serialization failed: {e}"),
        })?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;
        Ok(())
    }

    /// Maps the archive at `path`, validates it and deserializes it.
    pub fn read_mapped(path: &Path) -> Result<Self, IndexError> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(IndexError::Snapshot {
                reason: format!("{} is empty", path.display()),
            });
        }

        // SAFETY: the snapshot is only ever replaced by rename, never written in place.
        let mmap = unsafe { Mmap::map(&file)? };
        rkyv::from_bytes::<IndexSnapshot, RkyvError>(&mmap).map_err(|e| IndexError::Snapshot {
            reason: format!("validation failed: {e}"),
        })
    }
}
