//! Backend Module
//!
//! The durable key/value capability the cache index sits on, plus the
//! drivers that open it.
//!
//! # Drivers
//! - `memory` - process-lifetime storage, shared by every handle on a namespace
//! - `file` - one JSON document per namespace under a data directory

mod file;
mod memory;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::WireValue;
use crate::error::{Result, StorageError};

pub use file::{FileBackend, FileDriver};
pub use memory::{MemoryBackend, MemoryDriver};

/// Callback handed to [`Backend::iterate`]: value, key, 1-based sequence number.
pub type IterateCallback<'a> = &'a mut (dyn FnMut(WireValue, &str, usize) -> Option<WireValue> + Send);

// == Backend Trait ==
/// Asynchronous key/value storage scoped to one `(name, store_name)` namespace.
///
/// Implementations must be safe to share across tasks.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Resolves once the backend can serve requests.
    async fn ready(&self) -> Result<()>;

    /// Number of keys currently held.
    async fn length(&self) -> Result<usize>;

    async fn get_item(&self, key: &str) -> Result<Option<WireValue>>;

    async fn set_item(&self, key: &str, value: WireValue) -> Result<()>;

    async fn remove_item(&self, key: &str) -> Result<()>;

    /// Removes every key in the namespace.
    async fn clear(&self) -> Result<()>;

    async fn keys(&self) -> Result<Vec<String>>;

    /// Visits every stored value until the callback returns Some.
    async fn iterate(&self, callback: IterateCallback<'_>) -> Result<Option<WireValue>> {
        for (index, key) in self.keys().await?.into_iter().enumerate() {
            if let Some(value) = self.get_item(&key).await? {
                if let Some(result) = callback(value, &key, index + 1) {
                    return Ok(Some(result));
                }
            }
        }
        Ok(None)
    }
}

// == Driver Kind ==
/// Identifies a backend implementation in a preference list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    Memory,
    File,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverKind::Memory => write!(f, "memory"),
            DriverKind::File => write!(f, "file"),
        }
    }
}

impl FromStr for DriverKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "session" => Ok(DriverKind::Memory),
            "file" | "local" => Ok(DriverKind::File),
            other => Err(StorageError::InvalidRequest(format!(
                "Unknown driver: {}",
                other
            ))),
        }
    }
}

// == Backend Config ==
/// Construction parameters for a backend namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub name: String,
    pub store_name: String,
    pub description: String,
    /// Size hint in bytes. Recorded, not enforced.
    pub size: u64,
}

impl BackendConfig {
    /// Same configuration pointed at another namespace name.
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

// == Driver Trait ==
/// Factory for backends of one kind.
#[async_trait]
pub trait Driver: Send + Sync {
    fn kind(&self) -> DriverKind;

    /// Probe whether this driver can run in the current environment.
    fn supported(&self) -> bool;

    /// Opens the namespace described by `config`.
    ///
    /// Opening the same namespace twice yields the same shared handle.
    async fn open(&self, config: &BackendConfig) -> Result<Arc<dyn Backend>>;
}

/// Drivers available by default: the process-wide memory driver and a file
/// driver rooted at `data_dir` (unsupported when `data_dir` is None).
pub fn default_drivers(data_dir: Option<PathBuf>) -> Vec<Arc<dyn Driver>> {
    let memory: Arc<dyn Driver> = MemoryDriver::shared();
    let file: Arc<dyn Driver> = Arc::new(FileDriver::new(data_dir));
    vec![memory, file]
}

// == Select Driver ==
/// Picks the first driver in `preference` order that reports itself supported.
///
/// An empty preference list accepts any available driver in registration order.
pub fn select_driver(
    preference: &[DriverKind],
    available: &[Arc<dyn Driver>],
) -> Result<Arc<dyn Driver>> {
    let order: Vec<DriverKind> = if preference.is_empty() {
        available.iter().map(|d| d.kind()).collect()
    } else {
        preference.to_vec()
    };

    for kind in &order {
        for driver in available.iter().filter(|d| d.kind() == *kind) {
            if driver.supported() {
                debug!("Selected {} driver", kind);
                return Ok(driver.clone());
            }
            debug!("Driver {} is not supported here, skipping", kind);
        }
    }

    let names: Vec<String> = order.iter().map(ToString::to_string).collect();
    Err(StorageError::BackendUnsupported(format!(
        "none of [{}] is usable",
        names.join(", ")
    )))
}
