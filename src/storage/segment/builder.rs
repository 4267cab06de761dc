//! Segment Builder
//!
//! Writes sorted records to a new segment file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};

use crate::error::{Result, SiltError};

use super::{SegmentMeta, SegmentRecord, FRAME_HEADER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Builder for creating a new segment from sorted entries
///
/// Records are written to `<path>.tmp` and the file is renamed into place by
/// [`finish`](SegmentBuilder::finish) after an fsync, so a crash mid-build
/// never leaves a truncated file under the final name.
pub struct SegmentBuilder {
    /// Final file path
    path: PathBuf,
    /// Path written to until `finish`
    tmp_path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Number of records written
    entry_count: u64,
    /// Current write position (for index)
    current_offset: u64,
    /// Index: key → file offset of record
    index: Vec<(Vec<u8>, u64)>,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
    /// Reused frame buffer
    frame: BytesMut,
}

impl SegmentBuilder {
    /// Create a new segment builder
    ///
    /// Writes header immediately; call `add()`/`add_tombstone()` in strictly
    /// ascending key order, then `finish()` to write index and footer.
    pub fn new(path: &Path) -> Result<Self> {
        let mut tmp_name = path.as_os_str().to_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut writer = BufWriter::new(file);

        // Entry count placeholder, patched in finish
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&0u64.to_le_bytes())?;

        Ok(Self {
            path: path.to_path_buf(),
            tmp_path,
            writer,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            index: Vec::new(),
            data_hasher: crc32fast::Hasher::new(),
            frame: BytesMut::new(),
        })
    }

    /// Add a key-value pair (must be called in ascending key order)
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_record(&SegmentRecord::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    /// Add a tombstone (must be called in ascending key order)
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.write_record(&SegmentRecord::Tombstone { key: key.to_vec() })
    }

    fn write_record(&mut self, record: &SegmentRecord) -> Result<()> {
        let key = record.key();
        if let Some((last, _)) = self.index.last() {
            if key <= last.as_slice() {
                return Err(SiltError::Segment(format!(
                    "keys must be strictly ascending: {:?} after {:?}",
                    String::from_utf8_lossy(key),
                    String::from_utf8_lossy(last)
                )));
            }
        }

        let payload = bincode::serialize(record)?;
        let payload_len = u32::try_from(payload.len()).map_err(|_| {
            SiltError::Segment(format!("record too large: {} bytes", payload.len()))
        })?;

        // Frame: [payload_len][crc][payload]
        self.frame.clear();
        self.frame.reserve(FRAME_HEADER_SIZE as usize + payload.len());
        self.frame.put_u32_le(payload_len);
        self.frame.put_u32_le(crc32fast::hash(&payload));
        self.frame.put_slice(&payload);

        self.writer.write_all(&self.frame)?;
        self.data_hasher.update(&self.frame);

        self.index.push((key.to_vec(), self.current_offset));
        self.current_offset += self.frame.len() as u64;
        self.entry_count += 1;

        Ok(())
    }

    /// Finish building: write index block and footer, fsync, rename into
    /// place, and return metadata
    pub fn finish(mut self) -> Result<SegmentMeta> {
        let index_offset = self.current_offset;

        let mut block = BytesMut::new();
        for (key, offset) in &self.index {
            block.put_u32_le(key.len() as u32);
            block.put_u64_le(*offset);
            block.put_slice(key);
        }

        // Footer: index_offset (8) + data_crc (4) + padding (4)
        let data_crc = self.data_hasher.finalize();
        block.put_u64_le(index_offset);
        block.put_u32_le(data_crc);
        block.put_u32_le(0);

        self.writer.write_all(&block)?;
        self.writer.flush()?;

        let mut file = self.writer.into_inner().map_err(|e| {
            SiltError::Segment(format!("Failed to flush segment: {}", e))
        })?;
        file.seek(SeekFrom::Start(6))?; // After magic + version
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;
        let file_size = file.metadata()?.len();
        drop(file);

        fs::rename(&self.tmp_path, &self.path)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            sync_dir(dir)?;
        }

        let min_key = self.index.first().map(|(k, _)| k.clone()).unwrap_or_default();
        let max_key = self.index.last().map(|(k, _)| k.clone()).unwrap_or_default();

        Ok(SegmentMeta {
            path: self.path,
            entry_count: self.entry_count,
            min_key,
            max_key,
            file_size,
        })
    }
}

/// Persist a rename by syncing the parent directory
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
