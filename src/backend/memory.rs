//! Memory Backend
//!
//! Session-scoped storage: values live as long as the process.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{Backend, BackendConfig, Driver, DriverKind};
use crate::cache::WireValue;
use crate::error::Result;

static SHARED: Lazy<Arc<MemoryDriver>> = Lazy::new(|| Arc::new(MemoryDriver::new()));

// == Memory Backend ==
/// One in-memory namespace.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: RwLock<BTreeMap<String, WireValue>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn ready(&self) -> Result<()> {
        Ok(())
    }

    async fn length(&self) -> Result<usize> {
        Ok(self.items.read().await.len())
    }

    async fn get_item(&self, key: &str) -> Result<Option<WireValue>> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: WireValue) -> Result<()> {
        self.items.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.items.write().await.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().await.keys().cloned().collect())
    }
}

// == Memory Driver ==
/// Hands out memory backends, one per `(name, store_name)`.
#[derive(Debug, Default)]
pub struct MemoryDriver {
    stores: Mutex<HashMap<(String, String), Arc<MemoryBackend>>>,
}

impl MemoryDriver {
    /// Creates a driver with its own, isolated set of namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide driver instance.
    pub fn shared() -> Arc<MemoryDriver> {
        SHARED.clone()
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::Memory
    }

    fn supported(&self) -> bool {
        true
    }

    async fn open(&self, config: &BackendConfig) -> Result<Arc<dyn Backend>> {
        let mut stores = self.stores.lock().await;
        let key = (config.name.clone(), config.store_name.clone());
        let backend = stores
            .entry(key)
            .or_insert_with(|| {
                debug!(
                    "Creating memory namespace {}/{}",
                    config.name, config.store_name
                );
                Arc::new(MemoryBackend::new())
            })
            .clone();
        Ok(backend as Arc<dyn Backend>)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str) -> BackendConfig {
        BackendConfig {
            name: name.to_string(),
            store_name: "keyvaluepairs".to_string(),
            description: String::new(),
            size: 0,
        }
    }

    #[tokio::test]
    async fn test_memory_crud() {
        let backend = MemoryBackend::new();

        backend.set_item("a", WireValue::Bool(true)).await.unwrap();
        backend.set_item("b", WireValue::Null).await.unwrap();
        assert_eq!(backend.length().await.unwrap(), 2);
        assert_eq!(backend.get_item("a").await.unwrap(), Some(WireValue::Bool(true)));

        backend.remove_item("a").await.unwrap();
        assert_eq!(backend.get_item("a").await.unwrap(), None);
        assert_eq!(backend.keys().await.unwrap(), vec!["b".to_string()]);

        backend.clear().await.unwrap();
        assert_eq!(backend.length().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_driver_shares_namespace_handles() {
        let driver = MemoryDriver::new();

        let first = driver.open(&config("ns")).await.unwrap();
        let second = driver.open(&config("ns")).await.unwrap();
        let other = driver.open(&config("other")).await.unwrap();

        first.set_item("k", WireValue::Number(1.0)).await.unwrap();
        assert_eq!(second.get_item("k").await.unwrap(), Some(WireValue::Number(1.0)));
        assert_eq!(other.get_item("k").await.unwrap(), None);
    }
}
