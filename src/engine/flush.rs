//! Flush controller
//!
//! Drains the memtable into a new segment. Order matters:
//! 1. write the segment file (fsync, rename into place)
//! 2. append its id to the manifest (fsync)
//! 3. clear the memtable and write counter
//!
//! A failure in 1 or 2 returns before 3, so the memtable still holds every
//! write and a retry is safe. A crash between 1 and 2 leaves an orphan
//! segment file that no manifest line references; it is never read and the
//! next flush reusing its id overwrites it.

use crate::error::Result;
use crate::storage::SegmentId;

use super::EngineState;

impl EngineState {
    /// Flush once the write counter has reached `threshold`
    pub(crate) fn flush_if_needed(&mut self, threshold: usize) -> Result<Option<SegmentId>> {
        if self.memtable.should_flush(threshold) {
            self.flush()
        } else {
            Ok(None)
        }
    }

    /// Unconditional flush; `None` when the memtable was empty
    pub(crate) fn flush(&mut self) -> Result<Option<SegmentId>> {
        if self.memtable.is_empty() {
            self.memtable.reset_write_count();
            return Ok(None);
        }

        let id = self.storage.next_segment_id();
        let meta = self.storage.write_segment(id, &self.memtable)?;
        self.storage.register(id)?;

        tracing::info!(
            segment = %id,
            entries = meta.entry_count,
            bytes = meta.file_size,
            "flushed memtable"
        );

        self.memtable.clear();
        Ok(Some(id))
    }
}
