//! Options Module
//!
//! Controller-level and per-item configuration.

use std::path::PathBuf;

use crate::backend::{BackendConfig, DriverKind};

// == Defaults ==
/// Default namespace name
pub const DEFAULT_NAME: &str = "storage";
/// Default sub-store name
pub const DEFAULT_STORE_NAME: &str = "keyvaluepairs";
/// Default size hint in bytes
pub const DEFAULT_SIZE: u64 = 4_980_736;
/// Default TTL: never expire
pub const DEFAULT_MAX_AGE: i64 = -1;

// == Storage Options ==
/// Configuration a [`Storage`](crate::cache::Storage) is opened with.
///
/// Frozen once the storage is open; read it back through `Storage::options`.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageOptions {
    /// Default TTL in milliseconds (`<0` never, `0` ephemeral, `>0` TTL)
    pub max_age: i64,
    /// Backend preference, first supported wins
    pub driver: Vec<DriverKind>,
    pub name: String,
    pub description: String,
    pub size: u64,
    pub store_name: String,
    /// Root directory for the file driver
    pub data_dir: Option<PathBuf>,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            driver: vec![DriverKind::Memory, DriverKind::File],
            name: DEFAULT_NAME.to_string(),
            description: String::new(),
            size: DEFAULT_SIZE,
            store_name: DEFAULT_STORE_NAME.to_string(),
            data_dir: None,
        }
    }
}

impl StorageOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_driver(mut self, driver: Vec<DriverKind>) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_store_name(mut self, store_name: impl Into<String>) -> Self {
        self.store_name = store_name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Backend construction parameters for this namespace.
    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            name: self.name.clone(),
            store_name: self.store_name.clone(),
            description: self.description.clone(),
            size: self.size,
        }
    }
}

// == Set Options ==
/// Per-item overrides for `set_item`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// TTL in milliseconds; None falls back to the namespace default
    pub max_age: Option<i64>,
    pub description: Option<String>,
}

impl SetOptions {
    pub fn max_age(max_age: i64) -> Self {
        Self {
            max_age: Some(max_age),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
