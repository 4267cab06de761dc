//! MemTable implementation
//!
//! BTreeMap-backed table plus the write counter that decides flush timing.

use std::collections::btree_map;
use std::collections::BTreeMap;

use super::MemTableEntry;

/// In-memory table for recent writes
#[derive(Debug, Default)]
pub struct MemTable {
    data: BTreeMap<Vec<u8>, MemTableEntry>,
    /// Puts and deletes accepted since the table was created or cleared
    write_count: usize,
    /// Approximate key + value bytes held
    size: usize,
}

impl MemTable {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the entry for a key (value or tombstone)
    pub fn get(&self, key: &[u8]) -> Option<&MemTableEntry> {
        self.data.get(key)
    }

    /// Insert or overwrite a value. Returns the new write count.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Value(value))
    }

    /// Record a tombstone for a key. Returns the new write count.
    pub fn delete(&mut self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    fn insert(&mut self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        let key_len = key.len();
        let payload_len = entry.payload_len();
        match self.data.insert(key, entry) {
            // Key bytes were already counted
            Some(old) => self.size = self.size - old.payload_len() + payload_len,
            None => self.size += key_len + payload_len,
        }
        self.write_count += 1;
        self.write_count
    }

    /// Number of writes since the last clear
    pub fn write_count(&self) -> usize {
        self.write_count
    }

    /// Number of distinct keys (values and tombstones)
    pub fn entry_count(&self) -> usize {
        self.data.len()
    }

    /// Approximate size in bytes of keys and values held
    pub fn approximate_size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True once the write counter reached the threshold
    pub fn should_flush(&self, threshold: usize) -> bool {
        self.write_count >= threshold
    }

    /// Iterate all entries in ascending key order
    pub fn iter(&self) -> MemTableIter<'_> {
        MemTableIter {
            inner: self.data.iter(),
        }
    }

    /// Replace with a fresh empty table and a zero write counter
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Reset only the write counter (flush of an empty table)
    pub(crate) fn reset_write_count(&mut self) {
        self.write_count = 0;
    }
}

/// Iterator over MemTable entries in sorted key order
pub struct MemTableIter<'a> {
    inner: btree_map::Iter<'a, Vec<u8>, MemTableEntry>,
}

impl<'a> Iterator for MemTableIter<'a> {
    type Item = (&'a [u8], &'a MemTableEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k.as_slice(), v))
    }
}
