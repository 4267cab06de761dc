//! Storage Manager
//!
//! Owns the manifest and the open readers for every registered segment.
//!
//! ## Responsibilities
//! - Rebuild the segment list from the manifest on startup
//! - Write new segments and register them (segment first, manifest second)
//! - Hand out segments newest → oldest for the lookup path

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::memtable::{MemTable, MemTableEntry};

use super::manifest::Manifest;
use super::segment::{SegmentBuilder, SegmentId, SegmentMeta, SegmentReader};

/// Manages the segment layer
///
/// Not internally synchronized: the engine keeps it inside its state lock.
pub struct StorageManager {
    /// Directory holding the manifest and segment files
    data_dir: PathBuf,

    manifest: Manifest,

    /// Registered segments in manifest order (oldest first)
    segments: Vec<(SegmentId, SegmentReader)>,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Load the manifest (malformed lines are skipped)
    /// 3. Open and verify each listed segment; missing or corrupt ones are
    ///    logged and skipped
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let (manifest, ids) = Manifest::load(path)?;

        let mut segments = Vec::with_capacity(ids.len());
        for id in ids {
            let segment_path = Self::segment_path_with_dir(path, id);
            match Self::open_verified(&segment_path) {
                Ok(reader) => segments.push((id, reader)),
                Err(e) => {
                    tracing::warn!(segment = %id, error = %e, "skipping unreadable segment listed in manifest");
                }
            }
        }

        tracing::debug!(
            dir = %path.display(),
            segments = segments.len(),
            next = %manifest.next_id(),
            "storage opened"
        );

        Ok(Self {
            data_dir: path.to_path_buf(),
            manifest,
            segments,
        })
    }

    fn open_verified(path: &Path) -> Result<SegmentReader> {
        let mut reader = SegmentReader::open(path)?;
        reader.verify()?;
        Ok(reader)
    }

    /// Id the next flush will use
    pub fn next_segment_id(&self) -> SegmentId {
        self.manifest.next_id()
    }

    /// Materialize a memtable as segment `id`. Not yet visible to readers.
    pub fn write_segment(&self, id: SegmentId, memtable: &MemTable) -> Result<SegmentMeta> {
        let mut builder = SegmentBuilder::new(&self.segment_path(id))?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(key, v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(key)?,
            }
        }
        builder.finish()
    }

    /// Make a written segment visible: validate it, append it to the
    /// manifest, then add its reader as the newest segment.
    ///
    /// On error nothing in memory changes.
    pub fn register(&mut self, id: SegmentId) -> Result<()> {
        let reader = SegmentReader::open(&self.segment_path(id))?;
        self.manifest.append(id)?;
        self.segments.push((id, reader));
        Ok(())
    }

    /// Registered segments, newest first
    pub fn newest_first(&mut self) -> impl Iterator<Item = (SegmentId, &mut SegmentReader)> + '_ {
        self.segments.iter_mut().rev().map(|(id, reader)| (*id, reader))
    }

    /// Registered segment ids, oldest first
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.segments.iter().map(|(id, _)| *id).collect()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// File path of segment `id`
    pub fn segment_path(&self, id: SegmentId) -> PathBuf {
        Self::segment_path_with_dir(&self.data_dir, id)
    }

    fn segment_path_with_dir(dir: &Path, id: SegmentId) -> PathBuf {
        dir.join(id.file_name())
    }
}
