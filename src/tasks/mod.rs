//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a storage is open.
//!
//! # Tasks
//! - Maintenance: evicts outdated entries and flushes the metadata snapshot

mod maintenance;

pub use maintenance::spawn_maintenance_task;
