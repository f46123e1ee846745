//! Offline queue reconciliation.
//!
//! Periodically drains the offline queue through the punch gateway once
//! connectivity returns. Records are replayed with their original badge id
//! and punch time; each record succeeds or fails on its own so one bad
//! punch cannot block the batch.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use timepunch_core::OfflineQueue;

use crate::connection::Connection;
use crate::gateway::PunchGateway;
use crate::photos::PhotoStore;

/// Result of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub total: usize,
    pub synced: usize,
    pub failed: usize,
    /// Connection or storage error that prevented the pass, if any.
    pub error: Option<String>,
}

/// Replays queued punches once the service is reachable.
pub struct SyncReconciler {
    gateway: Arc<PunchGateway>,
    connection: Arc<Connection>,
    queue: Arc<OfflineQueue>,
    photos: Arc<PhotoStore>,
}

impl SyncReconciler {
    pub fn new(
        gateway: Arc<PunchGateway>,
        connection: Arc<Connection>,
        queue: Arc<OfflineQueue>,
        photos: Arc<PhotoStore>,
    ) -> Self {
        Self {
            gateway,
            connection,
            queue,
            photos,
        }
    }

    /// Drain the offline queue, oldest punch first.
    ///
    /// While offline this makes exactly one reconnect attempt; if that
    /// fails the queue is left untouched and the connection error is
    /// attached to the report.
    pub async fn sync(&self) -> SyncReport {
        if !self.connection.is_online() {
            info!("Offline; attempting to reconnect before syncing punches");
            if !self.connection.try_reconnect().await {
                warn!("Reconnect failed, skipping sync");
                return SyncReport {
                    error: self.connection.last_error(),
                    ..SyncReport::default()
                };
            }
        }

        let records = match self.queue.unsynced_records() {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to load unsynced punches");
                return SyncReport {
                    error: Some(e.to_string()),
                    ..SyncReport::default()
                };
            }
        };

        let mut report = SyncReport {
            total: records.len(),
            ..SyncReport::default()
        };
        if records.is_empty() {
            debug!("No offline punches to sync");
            return report;
        }

        for record in &records {
            if !self
                .gateway
                .replay(&record.employee_id, record.punch_time)
                .await
            {
                report.failed += 1;
                continue;
            }

            // The punch is authoritative; the photo is best-effort and
            // must not block marking the record synced.
            if let Some(name) = &record.image_filename {
                match self.photos.read_backup(name) {
                    Some(bytes) => {
                        if self.gateway.upload_image(name, &bytes).await {
                            info!(
                                employee_id = %record.employee_id,
                                file = %name,
                                "Uploaded image for synced punch"
                            );
                        } else {
                            warn!(
                                employee_id = %record.employee_id,
                                file = %name,
                                "Image upload failed for synced punch"
                            );
                        }
                    }
                    None => {
                        warn!(file = %name, "Image backup not found for synced punch");
                    }
                }
            }

            match self.queue.mark_synced(record.id) {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    error!(id = record.id, error = %e, "Failed to mark punch synced");
                    report.failed += 1;
                }
            }
        }

        info!(
            total = report.total,
            synced = report.synced,
            failed = report.failed,
            "Offline punch sync finished"
        );
        report
    }
}
