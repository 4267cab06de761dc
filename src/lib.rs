//! # SiltKV
//!
//! A single-node, log-structured key-value store with:
//! - An in-memory memtable for recent writes
//! - Immutable sorted segment files produced by flushes
//! - An append-only manifest that defines the read view after a restart
//! - Tombstones so deletes survive flushes
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │          (acceptor + thread per connection)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                │
//! │           (one lock around all engine state)                │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐  flush   ┌──────────────────────┐
//!   │  MemTable   │ ───────▶ │  Segments + MANIFEST │
//!   │ (BTreeMap)  │          │  (newest → oldest)   │
//!   └─────────────┘          └──────────────────────┘
//! ```
//!
//! Segments are never compacted; they accumulate for the life of the data
//! directory.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod engine;
pub mod memtable;
pub mod network;
pub mod protocol;
pub mod storage;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use engine::Engine;
pub use error::{Result, SiltError};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of SiltKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
