//! Typed Stash - A typed, TTL-aware cache over pluggable key/value backends
//!
//! Values keep their kind (dates, regexps, special numbers) across the
//! backend boundary and expire per item or per namespace.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::{create_router, AppState};
pub use backend::{Backend, Driver, DriverKind};
pub use cache::{SetOptions, Storage, StorageOptions, Value};
pub use config::Config;
pub use error::{Result, StorageError};
pub use tasks::spawn_maintenance_task;
