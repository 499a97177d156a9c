//! Maintenance Task
//!
//! Background task that periodically prunes outdated entries and flushes the
//! metadata snapshot, so bookkeeping survives a crash between shutdowns.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::Storage;

/// Spawns a background task that prunes and flushes `storage` every `interval`.
///
/// The task runs until aborted. Failures are logged and retried on the next tick.
///
/// # Example
/// ```ignore
/// let storage = Storage::open(StorageOptions::default()).await?;
/// let handle = spawn_maintenance_task(storage.clone(), Duration::from_secs(30));
/// // Later, during shutdown:
/// handle.abort();
/// storage.flush().await?;
/// ```
pub fn spawn_maintenance_task(storage: Storage, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting maintenance task for {} with interval of {:?}",
            storage.name(),
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            match storage.prune_outdated().await {
                Ok(pruned) if !pruned.is_empty() => {
                    info!("Maintenance: pruned {} outdated entries", pruned.len())
                }
                Ok(_) => debug!("Maintenance: no outdated entries found"),
                Err(e) => warn!("Maintenance: prune failed: {}", e),
            }

            if let Err(e) = storage.flush().await {
                warn!("Maintenance: flush failed: {}", e);
            }
        }
    })
}
