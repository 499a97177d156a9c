//! Storage Module
//!
//! Public controller: orchestrates the index, the type codec and the backend.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::{default_drivers, select_driver, Backend, Driver, DriverKind};
use crate::cache::{
    codec, current_timestamp_ms, CacheEntry, Index, SetOptions, SnapshotStore, StorageOptions,
    Value, STORE_MAP_NAME,
};
use crate::error::{Result, StorageError};

// == Storage ==
/// TTL-aware typed cache over one backend namespace.
///
/// A `Storage` only exists once initialization has completed, so every
/// accessor is valid on any handle. Clones share the same index and backend.
///
/// Operations on one storage are serialized: the index lock is held across
/// the backend call, so calls on the same key apply in call order.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<Inner>,
}

struct Inner {
    options: StorageOptions,
    driver: DriverKind,
    backend: Arc<dyn Backend>,
    snapshots: SnapshotStore,
    index: RwLock<Index>,
}

impl Storage {
    // == Open ==
    /// Opens a storage with the default drivers.
    ///
    /// # Errors
    /// `BackendUnsupported` when no driver in `options.driver` can run here.
    pub async fn open(options: StorageOptions) -> Result<Self> {
        let drivers = default_drivers(options.data_dir.clone());
        Self::open_with(options, &drivers, None).await
    }

    /// Opens a storage against explicit drivers and, optionally, an explicit
    /// snapshot store. Without one, the snapshot namespace is opened through
    /// the selected driver.
    pub async fn open_with(
        options: StorageOptions,
        drivers: &[Arc<dyn Driver>],
        snapshots: Option<SnapshotStore>,
    ) -> Result<Self> {
        if options.name == STORE_MAP_NAME {
            return Err(StorageError::InvalidRequest(format!(
                "namespace {} is reserved for metadata snapshots",
                STORE_MAP_NAME
            )));
        }

        let driver = select_driver(&options.driver, drivers)?;
        let config = options.backend_config();

        let backend = driver.open(&config).await?;
        backend.ready().await?;

        let snapshots = match snapshots {
            Some(store) => store,
            None => SnapshotStore::open(driver.as_ref(), &config).await?,
        };

        let mut index = Index::new(options.name.clone(), options.max_age);
        index.set_count(backend.length().await?);
        index.reconcile_from(&snapshots).await;

        info!(
            "Storage {}/{} ready on {} driver ({} keys)",
            options.name,
            options.store_name,
            driver.kind(),
            index.count()
        );

        Ok(Self {
            inner: Arc::new(Inner {
                driver: driver.kind(),
                options,
                backend,
                snapshots,
                index: RwLock::new(index),
            }),
        })
    }

    // == Accessors ==
    /// Waits for the backend to report readiness.
    pub async fn ready(&self) -> Result<()> {
        self.inner.backend.ready().await
    }

    /// The driver that won selection.
    pub fn driver(&self) -> DriverKind {
        self.inner.driver
    }

    pub fn options(&self) -> &StorageOptions {
        &self.inner.options
    }

    pub fn name(&self) -> &str {
        &self.inner.options.name
    }

    pub fn store_name(&self) -> &str {
        &self.inner.options.store_name
    }

    pub fn description(&self) -> &str {
        &self.inner.options.description
    }

    pub fn size(&self) -> u64 {
        self.inner.options.size
    }

    pub fn default_max_age(&self) -> i64 {
        self.inner.options.max_age
    }

    /// Backend key count as of the last mutation.
    pub async fn length(&self) -> usize {
        self.inner.index.read().await.count()
    }

    async fn refresh_count(&self, index: &mut Index) -> Result<()> {
        index.set_count(self.inner.backend.length().await?);
        Ok(())
    }

    // == Set Item ==
    /// Stores `value` under `key` and returns it.
    ///
    /// With an effective `max_age` of 0 nothing is stored; any entry this
    /// storage already tracks for `key` is removed instead. Otherwise the
    /// entry is replaced wholesale. If the backend write fails the index is
    /// left as it was.
    ///
    /// The index caches the value as a later backend read would decode it.
    pub async fn set_item(&self, key: &str, value: Value, opts: SetOptions) -> Result<Value> {
        let mut index = self.inner.index.write().await;
        let max_age = index.effective_max_age(opts.max_age);

        if max_age == 0 {
            if index.remove(key).is_some() {
                debug!("Ephemeral set of {} drops its previous entry", key);
                self.inner.backend.remove_item(key).await?;
                self.refresh_count(&mut index).await?;
            }
            return Ok(value);
        }

        let wire = codec::encode(&value);
        self.inner.backend.set_item(key, wire.clone()).await?;

        let description = opts.description.unwrap_or_default();
        index.insert(CacheEntry::new(key, codec::decode(wire), description, max_age));
        self.refresh_count(&mut index).await?;

        Ok(value)
    }

    // == Update Item ==
    /// Replaces the value of an existing entry, keeping its policy and
    /// restarting its TTL. Falls back to `set_item` with defaults when the
    /// key is not tracked.
    pub async fn update_item(&self, key: &str, value: Value) -> Result<Value> {
        {
            let mut index = self.inner.index.write().await;
            if index.get(key).is_some_and(CacheEntry::is_usable) {
                let wire = codec::encode(&value);
                self.inner.backend.set_item(key, wire.clone()).await?;
                if let Some(entry) = index.get_mut(key) {
                    entry.update_data(codec::decode(wire));
                }
                return Ok(value);
            }
        }

        self.set_item(key, value, SetOptions::default()).await
    }

    // == Get Item ==
    /// Returns the value for `key`.
    ///
    /// # Errors
    /// - `NotFound` when no usable entry exists, or the backend lost the value
    /// - `Outdated` when the TTL elapsed; removal is then scheduled in the background
    pub async fn get_item(&self, key: &str) -> Result<Value> {
        let mut index = self.inner.index.write().await;

        let entry = match index.get(key) {
            Some(entry) if entry.is_usable() => entry,
            _ => return Err(StorageError::NotFound(key.to_string())),
        };

        if entry.is_outdated() {
            drop(index);
            self.spawn_eviction(key);
            return Err(StorageError::Outdated(key.to_string()));
        }

        if let Some(value) = entry.value() {
            debug!("Serving {} from index", key);
            return Ok(value.clone());
        }

        match self.inner.backend.get_item(key).await? {
            Some(wire) => {
                let value = codec::decode(wire);
                if let Some(entry) = index.get_mut(key) {
                    entry.fill_data(value.clone());
                }
                Ok(value)
            }
            None => {
                warn!("Backend has no value for tracked key {}, dropping entry", key);
                index.remove(key);
                self.refresh_count(&mut index).await?;
                Err(StorageError::NotFound(key.to_string()))
            }
        }
    }

    // == Remove Item ==
    /// Deletes the entry and its stored value.
    pub async fn remove_item(&self, key: &str) -> Result<()> {
        let mut index = self.inner.index.write().await;
        index.remove(key);
        self.inner.backend.remove_item(key).await?;
        self.refresh_count(&mut index).await
    }

    // == Clear ==
    /// Empties the index and the backend namespace.
    pub async fn clear(&self) -> Result<()> {
        let mut index = self.inner.index.write().await;
        index.clear();
        self.inner.backend.clear().await
    }

    // == Keys ==
    /// Sorted keys of every entry that has not expired.
    ///
    /// Outdated entries are left out and scheduled for background removal.
    pub async fn keys(&self) -> Vec<String> {
        let (mut valid, outdated) = {
            let index = self.inner.index.read().await;
            index.partition_keys(current_timestamp_ms())
        };

        for key in &outdated {
            self.spawn_eviction(key);
        }

        valid.sort();
        valid
    }

    // == Iterate ==
    /// Calls `callback(value, key, n)` for each live entry, `n` starting at 1.
    ///
    /// Stops at the first callback returning Some and resolves with that
    /// result. Entries that expire or vanish mid-iteration are skipped. The
    /// callback runs without any lock held.
    pub async fn iterate<F, R>(&self, mut callback: F) -> Result<Option<R>>
    where
        F: FnMut(Value, &str, usize) -> Option<R>,
    {
        let mut sequence = 0;
        for key in self.keys().await {
            let value = match self.get_item(&key).await {
                Ok(value) => value,
                Err(StorageError::NotFound(_)) | Err(StorageError::Outdated(_)) => continue,
                Err(e) => return Err(e),
            };

            sequence += 1;
            if let Some(result) = callback(value, &key, sequence) {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    // == Prune Outdated ==
    /// Removes every expired entry now and returns the removed keys.
    pub async fn prune_outdated(&self) -> Result<Vec<String>> {
        let mut index = self.inner.index.write().await;
        let (_, outdated) = index.partition_keys(current_timestamp_ms());
        if outdated.is_empty() {
            return Ok(outdated);
        }

        for key in &outdated {
            index.remove(key);
            self.inner.backend.remove_item(key).await?;
        }
        self.refresh_count(&mut index).await?;
        Ok(outdated)
    }

    /// Removes `key` if it is still outdated. Used for background eviction,
    /// so a fresh value written in the meantime survives.
    async fn evict_if_outdated(&self, key: &str) -> Result<bool> {
        let mut index = self.inner.index.write().await;
        if !index.get(key).is_some_and(CacheEntry::is_outdated) {
            return Ok(false);
        }
        index.remove(key);
        self.inner.backend.remove_item(key).await?;
        self.refresh_count(&mut index).await?;
        Ok(true)
    }

    fn spawn_eviction(&self, key: &str) {
        let storage = self.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            match storage.evict_if_outdated(&key).await {
                Ok(true) => debug!("Evicted outdated key {}", key),
                Ok(false) => {}
                Err(e) => warn!("Background eviction of {} failed: {}", key, e),
            }
        });
    }

    // == Flush ==
    /// Persists the metadata snapshot. Call on the host's shutdown path.
    ///
    /// Returns the number of records written; nothing is written when no
    /// entry is persistable.
    pub async fn flush(&self) -> Result<usize> {
        let index = self.inner.index.read().await;
        let written = index.persist(&self.inner.snapshots).await?;
        if written > 0 {
            info!("Flushed {} entries for {}", written, index.namespace());
        }
        Ok(written)
    }

    /// Flushes and drops this handle.
    pub async fn close(self) -> Result<()> {
        self.flush().await.map(|_| ())
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("name", &self.inner.options.name)
            .field("store_name", &self.inner.options.store_name)
            .field("driver", &self.inner.driver)
            .finish()
    }
}
