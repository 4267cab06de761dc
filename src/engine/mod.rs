//! Engine Module
//!
//! The storage engine that coordinates the memtable and the segment layer.
//!
//! ## Responsibilities
//! - Serialize every operation behind one state lock
//! - Route reads through the lookup path (memtable, then segments)
//! - Trigger flushes when enough writes have accumulated
//! - Rebuild the read view from the manifest on startup

mod flush;
mod lookup;

use std::path::Path;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::memtable::MemTable;
use crate::protocol::{Command, Response};
use crate::storage::{SegmentId, StorageManager};

/// Everything an operation may touch, owned by the engine's lock
pub(crate) struct EngineState {
    /// Recent writes and the write counter
    memtable: MemTable,

    /// Manifest plus open readers for registered segments
    storage: StorageManager,
}

/// The main storage engine
///
/// ## Concurrency Model
///
/// get, put, delete and flush all run under a single exclusive lock held for
/// the whole operation, including any flush a write triggers. Callers never
/// see a half-applied write or a half-finished flush. Network handlers share
/// the engine as `Arc<Engine>`.
pub struct Engine {
    config: Config,
    state: Mutex<EngineState>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate config
    /// 2. Create the data directory
    /// 3. Load the manifest and open every segment it lists that is intact
    /// 4. Start with an empty memtable
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let storage = StorageManager::open(&config.data_dir)?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            segments = storage.segment_count(),
            flush_threshold = config.flush_threshold,
            "engine opened"
        );

        Ok(Self {
            config,
            state: Mutex::new(EngineState {
                memtable: MemTable::new(),
                storage,
            }),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a command
    ///
    /// Malformed requests are rejected with `InvalidRequest` before any
    /// engine state is touched.
    pub fn execute(&self, command: Command) -> Result<Response> {
        command.validate()?;

        match command {
            Command::Get { key } => Ok(match self.get(&key) {
                Some(value) => Response::ok(Some(value)),
                None => Response::not_found(),
            }),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(Response::ok(Some(value)))
            }
            Command::Delete { key } => Ok(if self.delete(&key)? {
                Response::ok(None)
            } else {
                Response::not_found()
            }),
            Command::Ping => Ok(Response::ok(Some(b"PONG".to_vec()))),
        }
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (a tombstone here means not found)
    /// 2. Segments, newest to oldest
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        state.resolve(key)
    }

    /// Put a key-value pair
    ///
    /// The write always lands in the memtable. If it fills the memtable and
    /// the triggered flush fails, the error is returned but the write stays
    /// readable and the next write retries the flush.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        state.memtable.put(key.to_vec(), value.to_vec());
        state.flush_if_needed(self.config.flush_threshold)?;
        Ok(())
    }

    /// Delete a key
    ///
    /// Returns `Ok(false)` without recording anything when the key is not
    /// visible. Otherwise writes a tombstone, which shadows older segments
    /// and survives flushes and restarts.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut state = self.state.lock();
        if state.resolve(key).is_none() {
            return Ok(false);
        }
        state.memtable.delete(key.to_vec());
        state.flush_if_needed(self.config.flush_threshold)?;
        Ok(true)
    }

    /// Flush memtable to a new segment regardless of the write count
    ///
    /// Returns the new segment's id, or `None` if the memtable was empty.
    pub fn flush(&self) -> Result<Option<SegmentId>> {
        self.state.lock().flush()
    }

    /// Close the engine, flushing anything still in the memtable
    pub fn close(self) -> Result<()> {
        let flushed = self.flush()?;
        tracing::info!(segment = ?flushed, "engine closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Distinct keys (values and tombstones) in the memtable
    pub fn memtable_entry_count(&self) -> usize {
        self.state.lock().memtable.entry_count()
    }

    /// Writes accepted since the last successful flush
    pub fn pending_writes(&self) -> usize {
        self.state.lock().memtable.write_count()
    }

    /// Number of registered segments
    pub fn segment_count(&self) -> usize {
        self.state.lock().storage.segment_count()
    }

    /// Registered segment ids in manifest order (oldest first)
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        self.state.lock().storage.segment_ids()
    }
}
