//! Background tasks: reconnect probe, sync drain, retention cleanup.
//!
//! Each task is an interval loop with a `watch` shutdown receiver. They
//! run concurrently with foreground punches; the queue serializes its own
//! mutations.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use timepunch_core::OfflineQueue;

use crate::connection::Connection;
use crate::sync::SyncReconciler;

/// Spawn the reconnect probe. Only probes while offline; the gateway and
/// reconciler flip the state back themselves on successful calls.
pub fn spawn_reconnect_task(
    connection: Arc<Connection>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.tick().await; // Skip first immediate tick

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    if connection.is_online() {
                        continue;
                    }
                    if !connection.try_reconnect().await {
                        debug!(error = ?connection.last_error(), "Still offline");
                    }
                }
                _ = shutdown.changed() => {
                    info!("Reconnect task shutting down");
                    return;
                }
            }
        }
    })
}

/// Spawn the periodic offline queue drain.
pub fn spawn_sync_task(
    reconciler: Arc<SyncReconciler>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.tick().await; // Skip first immediate tick

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    let report = reconciler.sync().await;
                    if report.total > 0 || report.error.is_some() {
                        info!(
                            total = report.total,
                            synced = report.synced,
                            failed = report.failed,
                            error = ?report.error,
                            "Periodic sync pass"
                        );
                    }
                }
                _ = shutdown.changed() => {
                    info!("Sync task shutting down");
                    return;
                }
            }
        }
    })
}

/// Spawn the retention cleanup. Purges queue records past the retention
/// window regardless of sync state.
pub fn spawn_cleanup_task(
    queue: Arc<OfflineQueue>,
    retention_days: i64,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.tick().await; // Skip first immediate tick

        loop {
            tokio::select! {
                _ = timer.tick() => {
                    match queue.cleanup_older_than(retention_days) {
                        Ok(0) => debug!("Retention cleanup: nothing to delete"),
                        Ok(deleted) => info!(deleted, retention_days, "Purged old punch records"),
                        Err(e) => error!(error = %e, "Retention cleanup failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("Cleanup task shutting down");
                    return;
                }
            }
        }
    })
}
