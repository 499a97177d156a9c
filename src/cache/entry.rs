//! Cache Entry Module
//!
//! Per-key metadata and the lazily materialized value.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::{EntryMeta, Value};

// == Cache Entry ==
/// Metadata plus cached value for a single key.
///
/// `max_age` is in milliseconds: negative never expires, zero is never
/// persisted, positive is a time-to-live anchored at `updated_at`.
/// A `max_age` of None marks an entry rebuilt from unusable metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    key: String,
    value: Option<Value>,
    description: String,
    created_at: u64,
    updated_at: u64,
    max_age: Option<i64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a fresh entry holding `value`, stamped with the current time.
    pub fn new(key: impl Into<String>, value: Value, description: String, max_age: i64) -> Self {
        let now = current_timestamp_ms();

        Self {
            key: key.into(),
            value: Some(value),
            description,
            created_at: now,
            updated_at: now,
            max_age: Some(max_age),
        }
    }

    /// Rebuilds an entry from a snapshot record. The value stays unmaterialized.
    pub fn from_meta(key: impl Into<String>, meta: &EntryMeta) -> Self {
        let now = current_timestamp_ms();
        let updated_at = meta.updated_at.unwrap_or(now);

        Self {
            key: key.into(),
            value: None,
            description: meta.description.clone(),
            created_at: now.min(updated_at),
            updated_at,
            max_age: meta.max_age(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// The cached value, if it has been materialized.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn updated_at(&self) -> u64 {
        self.updated_at
    }

    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    /// Returns true when the entry carries a usable expiry policy.
    pub fn is_usable(&self) -> bool {
        self.max_age.is_some()
    }

    // == Fill Data ==
    /// Stores a value read back from the backend without touching timestamps.
    pub fn fill_data(&mut self, value: Value) -> &mut Self {
        self.value = Some(value);
        self
    }

    // == Update Data ==
    /// Replaces the value and refreshes `updated_at`, restarting the TTL.
    pub fn update_data(&mut self, value: Value) -> &mut Self {
        self.updated_at = current_timestamp_ms();
        self.fill_data(value)
    }

    // == Is Outdated ==
    /// Checks whether the TTL has elapsed.
    ///
    /// Boundary condition: the entry is still valid at exactly
    /// `updated_at + max_age`; it becomes outdated one millisecond later.
    pub fn is_outdated(&self) -> bool {
        self.is_outdated_at(current_timestamp_ms())
    }

    /// Expiry decision against an explicit clock reading.
    pub fn is_outdated_at(&self, now: u64) -> bool {
        match self.max_age {
            Some(max_age) if max_age > 0 => self.updated_at.saturating_add(max_age as u64) < now,
            _ => false,
        }
    }

    // == To Meta ==
    /// Snapshot record for this entry, or None without a usable policy.
    pub fn to_meta(&self) -> Option<EntryMeta> {
        self.max_age
            .map(|max_age| EntryMeta::new(self.description.clone(), self.updated_at, max_age))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
