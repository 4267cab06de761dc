//! Segment Iterator
//!
//! Sequential iteration over all records in a segment.

use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;

use crate::error::Result;

use super::reader::read_record;
use super::HEADER_SIZE;

/// Iterator over segment records in sorted key order
pub struct SegmentIterator<'a> {
    file: &'a mut BufReader<File>,
    path: &'a Path,
    /// Stop reading when we reach this offset (start of index block)
    end_offset: u64,
    current_offset: u64,
    /// Set after the first error so iteration stops
    failed: bool,
}

impl<'a> SegmentIterator<'a> {
    pub(super) fn new(file: &'a mut BufReader<File>, path: &'a Path, end_offset: u64) -> Result<Self> {
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(Self {
            file,
            path,
            end_offset,
            current_offset: HEADER_SIZE,
            failed: false,
        })
    }
}

impl<'a> Iterator for SegmentIterator<'a> {
    /// (key, value), with `None` for a tombstone
    type Item = Result<(Vec<u8>, Option<Vec<u8>>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.current_offset >= self.end_offset {
            return None;
        }

        match read_record(&mut *self.file, self.path, self.end_offset - self.current_offset) {
            Ok((record, frame_len)) => {
                self.current_offset += frame_len;
                Some(Ok(record.into_parts()))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
