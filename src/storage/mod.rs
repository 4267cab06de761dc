//! Storage Module
//!
//! Persistent layer: immutable sorted segments plus the manifest that lists
//! them in recency order.
//!
//! ## Layout
//! ```text
//! {data_dir}/
//!   MANIFEST          sst-000001.sst\nsst-000002.sst\n...
//!   sst-000001.sst    oldest segment
//!   sst-000002.sst
//! ```
//!
//! Segments are never merged. They accumulate for the life of the data
//! directory; there is no compaction.

mod manager;
mod manifest;
pub mod segment;

pub use manager::StorageManager;
pub use manifest::{Manifest, MANIFEST_FILENAME};
pub use segment::{Lookup, SegmentBuilder, SegmentId, SegmentMeta, SegmentReader, SegmentRecord};
