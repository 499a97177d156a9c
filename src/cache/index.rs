//! Index Module
//!
//! In-memory `key -> entry` map shadowing one backend namespace, reconciled
//! from and persisted to the metadata snapshot.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, Snapshot, SnapshotStore};
use crate::error::Result;

// == Index ==
/// Entry bookkeeping for one namespace.
#[derive(Debug)]
pub struct Index {
    /// Namespace name, also the snapshot record key
    namespace: String,
    entries: HashMap<String, CacheEntry>,
    /// TTL in milliseconds for entries that do not specify one
    default_max_age: i64,
    /// Backend key count as of the last mutation
    count: usize,
}

impl Index {
    // == Constructor ==
    pub fn new(namespace: impl Into<String>, default_max_age: i64) -> Self {
        Self {
            namespace: namespace.into(),
            entries: HashMap::new(),
            default_max_age,
            count: 0,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Policy applied when a write does not name its own `max_age`.
    pub fn default_max_age(&self) -> i64 {
        self.default_max_age
    }

    /// Effective policy for a write: the override if given, else the default.
    pub fn effective_max_age(&self, max_age: Option<i64>) -> i64 {
        max_age.unwrap_or(self.default_max_age)
    }

    /// Cached backend key count.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CacheEntry> {
        self.entries.get_mut(key)
    }

    /// Replaces any existing entry for the key.
    pub fn insert(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.key().to_string(), entry);
    }

    pub fn remove(&mut self, key: &str) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    /// Drops every entry and zeroes the count.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.count = 0;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // == Partition Keys ==
    /// Splits tracked keys into `(valid, outdated)` at time `now`.
    pub fn partition_keys(&self, now: u64) -> (Vec<String>, Vec<String>) {
        let mut valid = Vec::new();
        let mut outdated = Vec::new();
        for (key, entry) in &self.entries {
            if entry.is_outdated_at(now) {
                outdated.push(key.clone());
            } else {
                valid.push(key.clone());
            }
        }
        (valid, outdated)
    }

    // == Reconcile ==
    /// Rebuilds the entries from a previously persisted snapshot.
    ///
    /// Only runs when the backend still holds keys (`count > 0`); otherwise
    /// the index starts empty. Values are not restored, so the first read of
    /// each key goes to the backend.
    pub fn reconcile(&mut self, snapshot: Option<Snapshot>) {
        self.entries = match snapshot {
            Some(snapshot) if self.count > 0 => snapshot
                .iter()
                .map(|(key, meta)| (key.clone(), CacheEntry::from_meta(key.clone(), meta)))
                .collect(),
            _ => HashMap::new(),
        };

        info!(
            "Index {} reconciled with {} entries (backend holds {})",
            self.namespace,
            self.entries.len(),
            self.count
        );
    }

    /// Reads this namespace's snapshot from `store` and reconciles against it.
    ///
    /// An unreadable snapshot is logged and treated as absent.
    pub async fn reconcile_from(&mut self, store: &SnapshotStore) {
        let snapshot = if self.count > 0 {
            match store.read(&self.namespace).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Ignoring unreadable snapshot for {}: {}", self.namespace, e);
                    None
                }
            }
        } else {
            None
        };
        self.reconcile(snapshot);
    }

    // == Filter Persistable ==
    /// Metadata of every entry with a usable `max_age`, without values.
    pub fn filter_persistable(&self) -> Snapshot {
        self.entries
            .iter()
            .filter_map(|(key, entry)| entry.to_meta().map(|meta| (key.clone(), meta)))
            .collect()
    }

    // == Persist ==
    /// Writes the snapshot to `store`, skipping the write when nothing is persistable.
    ///
    /// Returns the number of records written.
    pub async fn persist(&self, store: &SnapshotStore) -> Result<usize> {
        let snapshot = self.filter_persistable();
        if snapshot.is_empty() {
            debug!("Index {} has nothing to persist", self.namespace);
            return Ok(0);
        }

        store.write(&self.namespace, &snapshot).await?;
        Ok(snapshot.len())
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, MemoryBackend};
    use crate::cache::{EntryMeta, Value};
    use std::sync::Arc;

    fn snapshot_of(keys: &[&str]) -> Snapshot {
        keys.iter()
            .map(|k| (k.to_string(), EntryMeta::new(String::new(), 1_000, -1)))
            .collect()
    }

    #[test]
    fn test_reconcile_populates_when_backend_non_empty() {
        let mut index = Index::new("ns", -1);
        index.set_count(2);

        index.reconcile(Some(snapshot_of(&["a", "b"])));

        assert_eq!(index.len(), 2);
        assert!(index.get("a").unwrap().value().is_none());
    }

    #[test]
    fn test_reconcile_skips_when_backend_empty() {
        let mut index = Index::new("ns", -1);

        index.reconcile(Some(snapshot_of(&["a", "b"])));

        assert!(index.is_empty());
    }

    #[test]
    fn test_reconcile_without_snapshot() {
        let mut index = Index::new("ns", -1);
        index.set_count(3);
        index.insert(CacheEntry::new("stale", Value::Null, String::new(), -1));

        index.reconcile(None);

        assert!(index.is_empty());
    }

    #[test]
    fn test_filter_persistable_excludes_unusable() {
        let mut index = Index::new("ns", -1);
        index.set_count(2);
        let mut snapshot = snapshot_of(&["good"]);
        snapshot.insert(
            "corrupt".to_string(),
            serde_json::from_str(r#"{"maxAge": "soon"}"#).unwrap(),
        );
        index.reconcile(Some(snapshot));
        index.insert(CacheEntry::new("fresh", Value::from("v"), "d".into(), 500));

        let persistable = index.filter_persistable();

        assert_eq!(persistable.len(), 2);
        assert!(persistable.contains_key("good"));
        assert_eq!(persistable["fresh"].max_age(), Some(500));
        assert_eq!(persistable["fresh"].description, "d");
        assert!(!persistable.contains_key("corrupt"));
    }

    #[test]
    fn test_effective_max_age_falls_back_to_default() {
        let index = Index::new("ns", 5_000);

        assert_eq!(index.default_max_age(), 5_000);
        assert_eq!(index.effective_max_age(None), 5_000);
        assert_eq!(index.effective_max_age(Some(-1)), -1);
    }

    #[tokio::test]
    async fn test_reconcile_from_keeps_good_records_beside_bad_ones() {
        let backend = Arc::new(MemoryBackend::new());
        let text = r#"{
            "good": {"description": "", "updatedAt": 1000, "maxAge": -1},
            "bad": {"description": "", "updatedAt": "x", "maxAge": -1},
            "junk": [1, 2]
        }"#;
        backend
            .set_item("ns", crate::cache::WireValue::String(text.to_string()))
            .await
            .unwrap();
        let store = SnapshotStore::new(backend);

        let mut index = Index::new("ns", -1);
        index.set_count(3);
        index.reconcile_from(&store).await;

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("good").unwrap().updated_at(), 1000);
        assert!(index.get("bad").unwrap().is_usable());
        assert!(index.get("junk").is_none());
    }

    #[test]
    fn test_partition_keys() {
        let mut index = Index::new("ns", -1);
        index.insert(CacheEntry::new("forever", Value::Null, String::new(), -1));
        index.insert(CacheEntry::new("short", Value::Null, String::new(), 10));

        let (valid, outdated) = index.partition_keys(u64::MAX);

        assert_eq!(valid, vec!["forever".to_string()]);
        assert_eq!(outdated, vec!["short".to_string()]);
    }

    #[test]
    fn test_clear_resets_count() {
        let mut index = Index::new("ns", -1);
        index.insert(CacheEntry::new("k", Value::Null, String::new(), -1));
        index.set_count(1);

        index.clear();

        assert!(index.is_empty());
        assert_eq!(index.count(), 0);
    }

    #[tokio::test]
    async fn test_persist_skips_empty_index() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SnapshotStore::new(backend.clone());
        let index = Index::new("ns", -1);

        assert_eq!(index.persist(&store).await.unwrap(), 0);
        assert_eq!(backend.length().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persist_then_reconcile_from() {
        let store = SnapshotStore::new(Arc::new(MemoryBackend::new()));
        let mut index = Index::new("ns", -1);
        index.insert(CacheEntry::new("a", Value::from(1i64), String::new(), -1));
        index.insert(CacheEntry::new("b", Value::from(2i64), String::new(), 60_000));

        assert_eq!(index.persist(&store).await.unwrap(), 2);

        let mut restored = Index::new("ns", -1);
        restored.set_count(2);
        restored.reconcile_from(&store).await;

        assert_eq!(restored.len(), 2);
        assert_eq!(restored.get("b").unwrap().max_age(), Some(60_000));
        assert!(restored.get("a").unwrap().value().is_none());
    }
}
