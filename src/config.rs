//! Configuration Module
//!
//! Handles loading and managing host configuration from environment variables.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::backend::DriverKind;
use crate::cache::{StorageOptions, DEFAULT_MAX_AGE, DEFAULT_NAME, DEFAULT_SIZE, DEFAULT_STORE_NAME};

/// Host configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Storage namespace name
    pub name: String,
    /// Sub-store name within the namespace
    pub store_name: String,
    pub description: String,
    /// Size hint in bytes
    pub size: u64,
    /// Default TTL in milliseconds for entries without explicit max age
    pub max_age: i64,
    /// Backend preference list
    pub driver: Vec<DriverKind>,
    /// Data directory for the file driver
    pub data_dir: Option<PathBuf>,
    /// HTTP server port
    pub server_port: u16,
    /// Maintenance task interval in seconds
    pub flush_interval: u64,
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Parses a comma-separated driver list, skipping unknown names.
fn parse_drivers(raw: &str) -> Vec<DriverKind> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .filter_map(|part| match part.parse() {
            Ok(kind) => Some(kind),
            Err(e) => {
                warn!("Ignoring driver entry: {}", e);
                None
            }
        })
        .collect()
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `STORAGE_NAME` - Namespace name (default: storage)
    /// - `STORAGE_STORE_NAME` - Sub-store name (default: keyvaluepairs)
    /// - `STORAGE_DESCRIPTION` - Free-form description (default: empty)
    /// - `STORAGE_SIZE` - Size hint in bytes (default: 4980736)
    /// - `STORAGE_MAX_AGE` - Default TTL in milliseconds (default: -1, never expire)
    /// - `STORAGE_DRIVER` - Comma-separated driver preference (default: memory,file)
    /// - `STORAGE_DATA_DIR` - File driver root (default: unset, file driver unavailable)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `FLUSH_INTERVAL` - Maintenance frequency in seconds (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            name: env::var("STORAGE_NAME").unwrap_or(defaults.name),
            store_name: env::var("STORAGE_STORE_NAME").unwrap_or(defaults.store_name),
            description: env::var("STORAGE_DESCRIPTION").unwrap_or(defaults.description),
            size: parse_var("STORAGE_SIZE").unwrap_or(defaults.size),
            max_age: parse_var("STORAGE_MAX_AGE").unwrap_or(defaults.max_age),
            driver: env::var("STORAGE_DRIVER")
                .ok()
                .map(|raw| parse_drivers(&raw))
                .filter(|drivers| !drivers.is_empty())
                .unwrap_or(defaults.driver),
            data_dir: env::var("STORAGE_DATA_DIR").ok().map(PathBuf::from),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            flush_interval: parse_var("FLUSH_INTERVAL").unwrap_or(defaults.flush_interval),
        }
    }

    /// Options for opening the configured storage.
    pub fn storage_options(&self) -> StorageOptions {
        StorageOptions {
            max_age: self.max_age,
            driver: self.driver.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            size: self.size,
            store_name: self.store_name.clone(),
            data_dir: self.data_dir.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            store_name: DEFAULT_STORE_NAME.to_string(),
            description: String::new(),
            size: DEFAULT_SIZE,
            max_age: DEFAULT_MAX_AGE,
            driver: vec![DriverKind::Memory, DriverKind::File],
            data_dir: None,
            server_port: 3000,
            flush_interval: 30,
        }
    }
}
