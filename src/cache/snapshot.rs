//! Metadata Snapshot Module
//!
//! Durable, whole-namespace record of entry metadata (never values), kept in
//! a reserved namespace separate from value storage.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::backend::{Backend, BackendConfig, Driver};
use crate::cache::WireValue;
use crate::error::{Result, StorageError};

/// Namespace holding every controller's snapshot, one record per namespace
pub const STORE_MAP_NAME: &str = "STORE_MAP";

/// Snapshot payload: key to metadata record.
pub type Snapshot = BTreeMap<String, EntryMeta>;

// == Entry Meta ==
/// Persisted metadata for one entry.
///
/// Fields are read leniently: a record whose `maxAge` is missing or not an
/// integer still loads, but yields no usable policy. A malformed
/// `description` or `updatedAt` reads as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMeta {
    #[serde(default, deserialize_with = "lenient_description")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<u64>,
    #[serde(default)]
    max_age: serde_json::Value,
}

fn lenient_description<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<u64>, D::Error> {
    Ok(serde_json::Value::deserialize(deserializer)?.as_u64())
}

impl EntryMeta {
    pub fn new(description: String, updated_at: u64, max_age: i64) -> Self {
        Self {
            description,
            updated_at: Some(updated_at),
            max_age: serde_json::Value::from(max_age),
        }
    }

    /// The expiry policy in milliseconds, if the record holds a whole number.
    pub fn max_age(&self) -> Option<i64> {
        match &self.max_age {
            serde_json::Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            }),
            _ => None,
        }
    }
}

// == Snapshot Store ==
/// Reads and writes snapshots in the reserved namespace.
///
/// Cloning shares the underlying backend handle.
#[derive(Clone)]
pub struct SnapshotStore {
    backend: Arc<dyn Backend>,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Opens the reserved namespace through `driver`.
    ///
    /// Drivers memoize handles per namespace, so every controller using the
    /// same driver shares one snapshot handle.
    pub async fn open(driver: &dyn Driver, config: &BackendConfig) -> Result<Self> {
        let backend = driver.open(&config.with_name(STORE_MAP_NAME)).await?;
        backend.ready().await?;
        Ok(Self::new(backend))
    }

    // == Read ==
    /// Loads the snapshot recorded for `namespace`, if any.
    ///
    /// Records that are not JSON objects are skipped with a warning; the rest
    /// of the snapshot still loads.
    pub async fn read(&self, namespace: &str) -> Result<Option<Snapshot>> {
        match self.backend.get_item(namespace).await? {
            None => Ok(None),
            Some(WireValue::String(text)) => Ok(Some(parse_records(namespace, &text)?)),
            Some(other) => Err(StorageError::Backend(format!(
                "snapshot for {} is not a JSON document: {:?}",
                namespace, other
            ))),
        }
    }

    // == Write ==
    /// Replaces the snapshot recorded for `namespace`.
    pub async fn write(&self, namespace: &str, snapshot: &Snapshot) -> Result<()> {
        let text = serde_json::to_string(snapshot)?;
        debug!(
            "Writing snapshot for {} ({} entries)",
            namespace,
            snapshot.len()
        );
        self.backend
            .set_item(namespace, WireValue::String(text))
            .await
    }
}

fn parse_records(namespace: &str, text: &str) -> Result<Snapshot> {
    let records: BTreeMap<String, serde_json::Value> = serde_json::from_str(text)?;

    let mut snapshot = Snapshot::new();
    for (key, record) in records {
        if !record.is_object() {
            warn!("Skipping malformed snapshot record {} in {}", key, namespace);
            continue;
        }
        match serde_json::from_value::<EntryMeta>(record) {
            Ok(meta) => {
                snapshot.insert(key, meta);
            }
            Err(e) => warn!("Skipping snapshot record {} in {}: {}", key, namespace, e),
        }
    }
    Ok(snapshot)
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore").finish_non_exhaustive()
    }
}
