//! Segment Reader
//!
//! Opens segment files, validates their layout, and answers point lookups by
//! binary search over the in-memory index.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Buf;

use crate::error::{Result, SiltError};

use super::iterator::SegmentIterator;
use super::{SegmentRecord, FOOTER_SIZE, FRAME_HEADER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Outcome of looking a key up in one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The segment holds a live value
    Found(Vec<u8>),
    /// The segment holds a tombstone; older segments must not be consulted
    Deleted,
    /// The segment says nothing about this key
    Absent,
}

/// Reader for segment files with an in-memory index
pub struct SegmentReader {
    path: PathBuf,
    /// File handle for reading records
    pub(super) file: BufReader<File>,
    /// Sorted (key, record offset) pairs
    index: Vec<(Vec<u8>, u64)>,
    entry_count: u64,
    /// Index block starting offset (end of data block)
    pub(super) index_offset: u64,
    data_crc: u32,
}

impl SegmentReader {
    /// Open a segment for reading
    ///
    /// Validates header, footer and index block, and loads the index into
    /// memory. Any structural inconsistency is a `SiltError::Segment`.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(corrupt(path, format!("file too small ({} bytes)", file_size)));
        }

        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;
        let mut cursor = &header[..];

        let mut magic = [0u8; 4];
        cursor.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(corrupt(path, format!("invalid magic {:?}", magic)));
        }

        let version = cursor.get_u16_le();
        if version != VERSION {
            return Err(corrupt(path, format!("unsupported version {}", version)));
        }

        let entry_count = cursor.get_u64_le();

        file.seek(SeekFrom::Start(file_size - FOOTER_SIZE))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;
        let mut cursor = &footer[..];
        let index_offset = cursor.get_u64_le();
        let data_crc = cursor.get_u32_le();

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(corrupt(path, format!("index offset {} out of bounds", index_offset)));
        }

        let index_block_size = file_size - FOOTER_SIZE - index_offset;
        let mut index_data = vec![0u8; index_block_size as usize];
        file.seek(SeekFrom::Start(index_offset))?;
        file.read_exact(&mut index_data)?;

        let index = parse_index(path, &index_data, index_offset)?;
        if index.len() as u64 != entry_count {
            return Err(corrupt(
                path,
                format!("header count {} but index has {} entries", entry_count, index.len()),
            ));
        }

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            file: BufReader::new(file),
            index,
            entry_count,
            index_offset,
            data_crc,
        })
    }

    /// Look a key up: binary search the index, then read one record
    pub fn get(&mut self, key: &[u8]) -> Result<Lookup> {
        let offset = match self.index.binary_search_by(|(k, _)| k.as_slice().cmp(key)) {
            Ok(pos) => self.index[pos].1,
            Err(_) => return Ok(Lookup::Absent),
        };

        let record = self.read_record_at(offset)?;
        if record.key() != key {
            return Err(corrupt(&self.path, format!("index points at wrong record (offset {})", offset)));
        }

        Ok(match record {
            SegmentRecord::Put { value, .. } => Lookup::Found(value),
            SegmentRecord::Tombstone { .. } => Lookup::Deleted,
        })
    }

    fn read_record_at(&mut self, offset: u64) -> Result<SegmentRecord> {
        self.file.seek(SeekFrom::Start(offset))?;
        read_record(&mut self.file, &self.path, self.index_offset - offset)
            .map(|(record, _)| record)
    }

    /// Recompute the data-block CRC and compare it to the footer
    pub fn verify(&mut self) -> Result<()> {
        self.file.seek(SeekFrom::Start(HEADER_SIZE))?;
        let mut hasher = crc32fast::Hasher::new();
        let mut remaining = self.index_offset - HEADER_SIZE;
        let mut buf = [0u8; 8192];
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            self.file.read_exact(&mut buf[..chunk])?;
            hasher.update(&buf[..chunk]);
            remaining -= chunk as u64;
        }
        let actual = hasher.finalize();
        if actual != self.data_crc {
            return Err(corrupt(
                &self.path,
                format!("data CRC mismatch: footer {:08x}, computed {:08x}", self.data_crc, actual),
            ));
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.first().map(|(k, _)| k.as_slice())
    }

    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.last().map(|(k, _)| k.as_slice())
    }

    /// Quick check if a key might be in this segment (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => key >= min && key <= max,
            _ => false,
        }
    }

    /// Iterate all records in key order
    pub fn iter(&mut self) -> Result<SegmentIterator<'_>> {
        SegmentIterator::new(&mut self.file, &self.path, self.index_offset)
    }
}

/// Read one framed record at the reader's current position.
///
/// `limit` is the number of bytes left in the data block; a frame claiming
/// more is corrupt. Returns the record and the frame length.
pub(super) fn read_record<R: Read>(
    reader: &mut R,
    path: &Path,
    limit: u64,
) -> Result<(SegmentRecord, u64)> {
    if limit < FRAME_HEADER_SIZE {
        return Err(corrupt(path, "truncated record header".to_string()));
    }

    let mut header = [0u8; FRAME_HEADER_SIZE as usize];
    reader.read_exact(&mut header)?;
    let mut cursor = &header[..];
    let payload_len = cursor.get_u32_le() as u64;
    let expected_crc = cursor.get_u32_le();

    if payload_len > limit - FRAME_HEADER_SIZE {
        return Err(corrupt(path, format!("record length {} overruns data block", payload_len)));
    }

    let mut payload = vec![0u8; payload_len as usize];
    reader.read_exact(&mut payload)?;

    if crc32fast::hash(&payload) != expected_crc {
        return Err(corrupt(path, "record CRC mismatch".to_string()));
    }

    let record: SegmentRecord = bincode::deserialize(&payload)?;
    Ok((record, FRAME_HEADER_SIZE + payload_len))
}

/// Parse index entries: [key_len(4)][offset(8)][key]
fn parse_index(path: &Path, data: &[u8], index_offset: u64) -> Result<Vec<(Vec<u8>, u64)>> {
    let mut index: Vec<(Vec<u8>, u64)> = Vec::new();
    let mut cursor = data;

    while cursor.has_remaining() {
        if cursor.remaining() < 12 {
            return Err(corrupt(path, "truncated index entry".to_string()));
        }
        let key_len = cursor.get_u32_le() as usize;
        let offset = cursor.get_u64_le();
        if cursor.remaining() < key_len {
            return Err(corrupt(path, "truncated index key".to_string()));
        }
        let key = cursor[..key_len].to_vec();
        cursor.advance(key_len);

        if offset < HEADER_SIZE || offset >= index_offset {
            return Err(corrupt(path, format!("record offset {} out of bounds", offset)));
        }
        if let Some((last, _)) = index.last() {
            if key.as_slice() <= last.as_slice() {
                return Err(corrupt(path, "index keys not strictly ascending".to_string()));
            }
        }
        index.push((key, offset));
    }

    Ok(index)
}

fn corrupt(path: &Path, reason: String) -> SiltError {
    SiltError::Segment(format!("{}: {}", path.display(), reason))
}
