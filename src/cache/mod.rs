//! Cache Module
//!
//! Typed, TTL-aware caching index over a pluggable backend.

pub mod codec;
mod entry;
mod index;
mod options;
mod snapshot;
mod store;
mod value;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry};
pub use index::Index;
pub use options::{
    SetOptions, StorageOptions, DEFAULT_MAX_AGE, DEFAULT_NAME, DEFAULT_SIZE, DEFAULT_STORE_NAME,
};
pub use snapshot::{EntryMeta, Snapshot, SnapshotStore, STORE_MAP_NAME};
pub use store::Storage;
pub use value::{RegExpValue, Value, WireValue};
