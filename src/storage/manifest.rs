//! Manifest
//!
//! Append-only list of live segments, oldest first, one file name per line.
//! A segment becomes visible only once its line has been written and
//! fsynced here; this file alone decides what a restart will read.

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, SiltError};

use super::segment::SegmentId;

/// Manifest file name inside the data directory
pub const MANIFEST_FILENAME: &str = "MANIFEST";

/// Handle to the on-disk manifest
#[derive(Debug)]
pub struct Manifest {
    path: PathBuf,
    file: File,
    /// Highest well-formed id ever recorded, including entries whose segment
    /// later failed to open. New ids must stay above it or a reload would
    /// drop them as out of order.
    highest: Option<SegmentId>,
    /// The file ends in a torn (newline-less) line
    needs_newline: bool,
}

impl Manifest {
    /// Load the manifest in `dir`, creating an empty one if none exists.
    ///
    /// Returns the well-formed, strictly increasing ids in file order.
    /// Malformed or out-of-order lines are logged and skipped; only I/O
    /// failures are errors.
    pub fn load(dir: &Path) -> Result<(Self, Vec<SegmentId>)> {
        let path = dir.join(MANIFEST_FILENAME);

        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let mut ids: Vec<SegmentId> = Vec::new();
        let mut highest: Option<SegmentId> = None;

        for (lineno, raw) in data.split(|&b| b == b'\n').enumerate() {
            let line = String::from_utf8_lossy(raw);
            let name = line.trim();
            if name.is_empty() {
                continue;
            }

            let Some(id) = SegmentId::parse_file_name(name) else {
                tracing::warn!(line = lineno + 1, entry = %name, "skipping malformed manifest entry");
                continue;
            };

            if highest.is_some_and(|h| id <= h) {
                tracing::warn!(line = lineno + 1, entry = %name, "skipping out-of-order manifest entry");
                continue;
            }

            highest = Some(id);
            ids.push(id);
        }

        let needs_newline = data.last().is_some_and(|&b| b != b'\n');

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok((
            Self {
                path,
                file,
                highest,
                needs_newline,
            },
            ids,
        ))
    }

    /// Durably append a segment id.
    ///
    /// Ids must be strictly greater than every id already recorded and no
    /// larger than [`SegmentId::MAX`].
    pub fn append(&mut self, id: SegmentId) -> Result<()> {
        if id > SegmentId::MAX {
            return Err(SiltError::Manifest(format!(
                "segment id {} exceeds the largest usable id",
                id
            )));
        }
        if self.highest.is_some_and(|h| id <= h) {
            return Err(SiltError::Manifest(format!(
                "segment {} is not newer than last recorded segment {}",
                id,
                self.highest.map(|h| h.to_string()).unwrap_or_default()
            )));
        }

        let mut line = String::with_capacity(20);
        if self.needs_newline {
            line.push('\n');
        }
        line.push_str(&id.file_name());
        line.push('\n');

        if let Err(e) = self.write_line(&line) {
            // Part of the line may have landed; start the next one fresh
            self.needs_newline = true;
            return Err(e.into());
        }

        self.needs_newline = false;
        self.highest = Some(id);
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()
    }

    /// Id the next flush should use
    pub fn next_id(&self) -> SegmentId {
        self.highest.map(SegmentId::next).unwrap_or(SegmentId::FIRST)
    }

    pub fn highest(&self) -> Option<SegmentId> {
        self.highest
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
