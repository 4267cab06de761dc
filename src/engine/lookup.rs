//! Lookup path: memtable first, then segments newest → oldest.

use crate::memtable::MemTableEntry;
use crate::storage::Lookup;

use super::EngineState;

impl EngineState {
    /// Resolve a key to its current value.
    ///
    /// The first tier that knows the key decides: a memtable or segment
    /// tombstone ends the search with `None`. A segment that fails to read
    /// is logged and treated as not holding the key.
    pub(crate) fn resolve(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        if let Some(entry) = self.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Some(value.clone()),
                MemTableEntry::Tombstone => None,
            };
        }

        for (id, reader) in self.storage.newest_first() {
            if !reader.might_contain(key) {
                continue;
            }

            match reader.get(key) {
                Ok(Lookup::Found(value)) => return Some(value),
                Ok(Lookup::Deleted) => return None,
                Ok(Lookup::Absent) => continue,
                Err(e) => {
                    tracing::warn!(segment = %id, error = %e, "segment read failed, skipping");
                    continue;
                }
            }
        }

        None
    }
}
