//! File Backend
//!
//! Persistent storage: each namespace is a JSON document on disk, rewritten
//! after every mutation.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use super::{Backend, BackendConfig, Driver, DriverKind};
use crate::cache::WireValue;
use crate::error::{Result, StorageError};

/// Open handles by document path. Weak, so a namespace closes with its last user.
static OPEN_FILES: Lazy<Mutex<HashMap<PathBuf, Weak<FileBackend>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

// == File Backend ==
/// One namespace backed by a JSON document.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    items: RwLock<BTreeMap<String, WireValue>>,
}

impl FileBackend {
    /// Loads the document at `path`, starting empty if it does not exist yet.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let items = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            items: RwLock::new(items),
        })
    }

    /// Writes the whole document through a temporary file and a rename.
    async fn write_document(&self, items: &BTreeMap<String, WireValue>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec(items)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for FileBackend {
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
        let mut items = self.items.write().await;
        let previous = items.insert(key.to_string(), value);
        if let Err(e) = self.write_document(&items).await {
            // Keep memory and disk in agreement
            match previous {
                Some(prev) => items.insert(key.to_string(), prev),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.write().await;
        if items.remove(key).is_some() {
            self.write_document(&items).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut items = self.items.write().await;
        items.clear();
        self.write_document(&items).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().await.keys().cloned().collect())
    }
}

// == File Driver ==
/// Opens namespaces as `<root>/<name>/<store_name>.json`.
#[derive(Debug, Clone)]
pub struct FileDriver {
    root: Option<PathBuf>,
}

impl FileDriver {
    /// A driver without a root is never supported.
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    fn document_path(root: &Path, config: &BackendConfig) -> PathBuf {
        root.join(sanitize(&config.name))
            .join(format!("{}.json", sanitize(&config.store_name)))
    }
}

/// Maps a namespace component onto a safe file name.
fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl Driver for FileDriver {
    fn kind(&self) -> DriverKind {
        DriverKind::File
    }

    fn supported(&self) -> bool {
        match &self.root {
            Some(root) => std::fs::create_dir_all(root).is_ok(),
            None => false,
        }
    }

    async fn open(&self, config: &BackendConfig) -> Result<Arc<dyn Backend>> {
        let root = self.root.as_deref().ok_or_else(|| {
            StorageError::BackendUnsupported("file driver has no data directory".into())
        })?;
        let path = Self::document_path(root, config);

        // Held across the load so concurrent opens of one path build one handle
        let mut open = OPEN_FILES.lock().await;
        if let Some(existing) = open.get(&path).and_then(Weak::upgrade) {
            debug!("Reusing open document {}", path.display());
            return Ok(existing as Arc<dyn Backend>);
        }

        let backend = Arc::new(FileBackend::load(path.clone()).await?);
        info!("Opened file namespace at {}", path.display());
        open.retain(|_, handle| handle.strong_count() > 0);
        open.insert(path, Arc::downgrade(&backend));
        Ok(backend as Arc<dyn Backend>)
    }
}
