//! Segment Module
//!
//! Immutable, sorted on-disk key-value files produced by memtable flushes.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                       │
//! │   Magic: "SILT" (4) | Version: u16 (2) | Count: u64 (8) │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [PayloadLen: u32][CRC32: u32][bincode SegmentRecord]  │
//! │   ... repeated for each entry, ascending by key ...     │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                  │
//! │   [KeyLen: u32][Offset: u64][Key]                       │
//! │   ... repeated for each entry ...                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   IndexOffset: u64 (8) | DataCRC: u32 (4) | Padding (4) │
//! └─────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian.

mod builder;
mod iterator;
mod reader;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use builder::SegmentBuilder;
pub use iterator::SegmentIterator;
pub use reader::{Lookup, SegmentReader};

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Magic bytes identifying a SiltKV segment file
pub(crate) const MAGIC: &[u8; 4] = b"SILT";

/// Current segment format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) = 14 bytes
pub(crate) const HEADER_SIZE: u64 = 14;

/// Footer size: IndexOffset (8) + DataCRC (4) + Padding (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Per-record frame header: PayloadLen (4) + CRC32 (4)
pub(crate) const FRAME_HEADER_SIZE: u64 = 8;

const FILE_PREFIX: &str = "sst-";
const FILE_SUFFIX: &str = ".sst";
const ID_WIDTH: usize = 6;

// =============================================================================
// Segment Identifier
// =============================================================================

/// Monotonically increasing segment identifier, starting at 1.
///
/// Rendered zero-padded (`sst-000042.sst`) so file names sort the same way
/// lexicographically as the ids do numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub u64);

impl SegmentId {
    pub const FIRST: SegmentId = SegmentId(1);

    /// Largest id accepted from a file name or by the manifest; `next` of
    /// any id up to this never wraps
    pub const MAX: SegmentId = SegmentId(u64::MAX - 1);

    /// Following id; stays at `u64::MAX` instead of wrapping
    pub fn next(self) -> SegmentId {
        SegmentId(self.0.saturating_add(1))
    }

    /// "sst-000042.sst"
    pub fn file_name(self) -> String {
        format!("{}{:0width$}{}", FILE_PREFIX, self.0, FILE_SUFFIX, width = ID_WIDTH)
    }

    /// Strict inverse of [`SegmentId::file_name`].
    ///
    /// Rejects id 0, ids above [`SegmentId::MAX`], non-digits, and anything
    /// that would not render back to the same name (short padding, extra
    /// leading zeros).
    pub fn parse_file_name(name: &str) -> Option<SegmentId> {
        let digits = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
        if digits.len() < ID_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let id = SegmentId(digits.parse().ok()?);
        if id.0 == 0 || id > SegmentId::MAX || id.file_name() != name {
            return None;
        }
        Some(id)
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = ID_WIDTH)
    }
}

// =============================================================================
// On-disk Record
// =============================================================================

/// A single data-block record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentRecord {
    Put { key: Vec<u8>, value: Vec<u8> },
    Tombstone { key: Vec<u8> },
}

impl SegmentRecord {
    pub fn key(&self) -> &[u8] {
        match self {
            SegmentRecord::Put { key, .. } | SegmentRecord::Tombstone { key } => key,
        }
    }

    /// (key, value) with `None` for a tombstone
    pub fn into_parts(self) -> (Vec<u8>, Option<Vec<u8>>) {
        match self {
            SegmentRecord::Put { key, value } => (key, Some(value)),
            SegmentRecord::Tombstone { key } => (key, None),
        }
    }
}

// =============================================================================
// Segment Metadata
// =============================================================================

/// Summary of a finished segment, returned by [`SegmentBuilder::finish`]
#[derive(Debug, Clone)]
pub struct SegmentMeta {
    /// Path to the segment file
    pub path: PathBuf,
    /// Number of records (values and tombstones)
    pub entry_count: u64,
    /// Smallest key (empty when the segment is empty)
    pub min_key: Vec<u8>,
    /// Largest key (empty when the segment is empty)
    pub max_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
}

impl SegmentMeta {
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Quick check if a key might be in this segment (range check)
    pub fn might_contain(&self, key: &[u8]) -> bool {
        self.entry_count > 0 && key >= self.min_key.as_slice() && key <= self.max_key.as_slice()
    }
}
