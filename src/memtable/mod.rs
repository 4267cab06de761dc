//! MemTable Module
//!
//! In-memory buffer for the most recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Count writes since the last flush (drives the flush trigger)
//! - Record tombstones so deletes shadow older segments
//! - Ordered iteration for segment creation
//!
//! ## Data Structure Choice
//! A plain BTreeMap: keys come out sorted for the segment builder, and the
//! engine already serializes every access behind its state lock, so the
//! table itself carries no lock.

mod table;

pub use table::{MemTable, MemTableIter};

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl MemTableEntry {
    /// Bytes this entry contributes to the approximate size
    pub(crate) fn payload_len(&self) -> usize {
        match self {
            MemTableEntry::Value(v) => v.len(),
            MemTableEntry::Tombstone => 0,
        }
    }
}
