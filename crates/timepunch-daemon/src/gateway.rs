//! Punch gateway: the online/offline state machine around the swipe call.
//!
//! Every punch goes through [`PunchGateway::record`]: throttle check,
//! connectivity gate, deadline-bounded remote call, then classification
//! into one of four outcomes. Connectivity failures fall back to the
//! offline queue; definitive answers from the remote system never do.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use tracing::{debug, error, info, warn};

use timepunch_core::config::{MAX_IMAGE_UPLOAD_SECS, MAX_PUNCH_CALL_SECS};
use timepunch_core::exceptions::{self, ExceptionMessage, NOT_AUTHORIZED};
use timepunch_core::{OfflineQueue, Result};

use crate::connection::Connection;
use crate::photos::PhotoStore;
use crate::remote::codec::encode_swipe_input;
use crate::remote::types::system_error_message;
use crate::remote::{SwipeApi, SwipeSummary};
use crate::throttle::PunchThrottle;

/// Deadlines applied on top of the transport timeout.
#[derive(Debug, Clone, Copy)]
pub struct GatewayTimeouts {
    pub call: Duration,
    pub upload: Duration,
}

impl GatewayTimeouts {
    /// Derive deadlines from the configured per-call budget. The punch
    /// call is capped so a hung network call can never freeze a kiosk
    /// lane for more than a few seconds.
    pub const fn from_config(timeout_secs: u64) -> Self {
        Self {
            call: Duration::from_secs(min_u64(timeout_secs, MAX_PUNCH_CALL_SECS)),
            upload: Duration::from_secs(min_u64(timeout_secs, MAX_IMAGE_UPLOAD_SECS)),
        }
    }
}

const fn min_u64(a: u64, b: u64) -> u64 {
    if a < b { a } else { b }
}

/// Result of a punch attempt.
#[derive(Debug, Clone)]
pub enum PunchOutcome {
    /// The remote system recorded the punch.
    Accepted {
        /// `"checkin"` or `"checkout"`.
        punch_type: String,
        first_name: String,
        last_name: String,
        weekly_hours: Option<f64>,
    },
    /// The service was unreachable; the punch is queued for replay.
    StoredOffline { record_id: u64 },
    /// Definitive business rejection; shown to the employee, never queued.
    Rejected {
        code: i32,
        message: ExceptionMessage,
        /// True when answered from the throttle cache without a call.
        throttled: bool,
    },
    /// Remote system error (malformed input, unauthorized client, ...).
    /// Definitive, never queued.
    Failed { code: i32, message: &'static str },
}

impl PunchOutcome {
    /// Whether the punch data is safe: either recorded remotely or queued.
    pub const fn is_recorded(&self) -> bool {
        matches!(self, Self::Accepted { .. } | Self::StoredOffline { .. })
    }
}

/// The offline-resilient punch submission engine.
pub struct PunchGateway {
    api: Arc<dyn SwipeApi>,
    connection: Arc<Connection>,
    queue: Arc<OfflineQueue>,
    photos: Arc<PhotoStore>,
    throttle: PunchThrottle,
    timeouts: GatewayTimeouts,
}

impl PunchGateway {
    pub fn new(
        api: Arc<dyn SwipeApi>,
        connection: Arc<Connection>,
        queue: Arc<OfflineQueue>,
        photos: Arc<PhotoStore>,
        throttle: PunchThrottle,
        timeouts: GatewayTimeouts,
    ) -> Self {
        Self {
            api,
            connection,
            queue,
            photos,
            throttle,
            timeouts,
        }
    }

    /// Record a punch for an employee, handling both online and offline
    /// scenarios. `punch_time` is the moment the badge was presented.
    ///
    /// Storage failures propagate: once accepted from the caller, a punch
    /// must land either remotely or in the queue.
    pub async fn record(
        &self,
        employee_id: &str,
        punch_time: NaiveDateTime,
        department_override: Option<u32>,
        photo: Option<&[u8]>,
    ) -> Result<PunchOutcome> {
        if self.throttle.is_throttled(employee_id) {
            warn!(
                employee_id = %employee_id,
                "Throttling repeated punch after not-authorized rejection"
            );
            return Ok(PunchOutcome::Rejected {
                code: NOT_AUTHORIZED,
                message: exceptions::lookup(NOT_AUTHORIZED),
                throttled: true,
            });
        }

        info!(
            employee_id = %employee_id,
            punch_time = %punch_time,
            file = %PhotoStore::file_name(employee_id, punch_time),
            "Punch send"
        );

        if !self.connection.is_online() {
            info!("Offline; attempting to reconnect before processing punch");
            if !self.connection.try_reconnect().await {
                info!("Reconnection failed, storing punch locally");
                return self.store_offline(employee_id, punch_time, photo);
            }
        }

        let Some(summary) = self
            .submit(employee_id, punch_time, department_override)
            .await
        else {
            return self.store_offline(employee_id, punch_time, photo);
        };

        let outcome = self.classify(employee_id, &summary);
        if let (PunchOutcome::Accepted { .. }, Some(bytes)) = (&outcome, photo) {
            self.backup_and_upload(employee_id, punch_time, bytes).await;
        }
        Ok(outcome)
    }

    /// Replay a queued punch against the remote service. No throttle and
    /// no offline fallback: a failed replay leaves the record exactly as
    /// it was for the next sync cycle.
    pub async fn replay(&self, employee_id: &str, punch_time: NaiveDateTime) -> bool {
        let Some(summary) = self.submit(employee_id, punch_time, None).await else {
            return false;
        };
        if summary.system_error_code.is_none()
            && summary.punch_exception.is_none()
            && summary.punch_success
        {
            return true;
        }
        warn!(
            employee_id = %employee_id,
            punch_time = %punch_time,
            system_error = ?summary.system_error_code,
            exception = ?summary.punch_exception,
            "Replayed punch was not accepted"
        );
        false
    }

    /// Upload a photo under its punch-correlated filename, bounded by the
    /// upload deadline. Returns whether the upload went through; failures
    /// flip the connection offline but are otherwise the caller's to log.
    pub async fn upload_image(&self, file_name: &str, data: &[u8]) -> bool {
        let call = self.api.save_image(file_name, data, self.photos.client_dir());
        match tokio::time::timeout(self.timeouts.upload, call).await {
            Err(_) => {
                let msg = format!(
                    "Image upload timed out after {}s",
                    self.timeouts.upload.as_secs()
                );
                error!(file = %file_name, "{}", msg);
                self.connection.set_offline(msg);
                false
            }
            Ok(Err(e)) => {
                error!(file = %file_name, error = %e, "Image upload failed");
                self.connection.set_offline(e.to_string());
                false
            }
            Ok(Ok(())) => {
                info!(file = %file_name, "Image uploaded");
                self.connection.set_online();
                true
            }
        }
    }

    /// Execute the bounded swipe call, updating connection state. `None`
    /// means a connectivity failure (fault or deadline expiry); the
    /// deadline drops the in-flight future rather than abandoning a
    /// worker, so a late response cannot surface anywhere.
    async fn submit(
        &self,
        employee_id: &str,
        punch_time: NaiveDateTime,
        department_override: Option<u32>,
    ) -> Option<SwipeSummary> {
        let swipe_input = encode_swipe_input(employee_id, punch_time, department_override);
        let call = async {
            if department_override.is_some() {
                self.api
                    .record_swipe_summary_department_override(&swipe_input)
                    .await
            } else {
                self.api.record_swipe_summary(&swipe_input).await
            }
        };

        match tokio::time::timeout(self.timeouts.call, call).await {
            Err(_) => {
                let msg = format!(
                    "Swipe call timed out after {}s",
                    self.timeouts.call.as_secs()
                );
                error!(employee_id = %employee_id, "{}", msg);
                self.connection.set_offline(msg);
                None
            }
            Ok(Err(e)) => {
                warn!(employee_id = %employee_id, error = %e, "Swipe call failed");
                self.connection.set_offline(e.to_string());
                None
            }
            Ok(Ok(summary)) => {
                // Any response inside the deadline means we are online.
                self.connection.set_online();
                Some(summary)
            }
        }
    }

    /// Classify an in-deadline response and update the throttle.
    fn classify(&self, employee_id: &str, summary: &SwipeSummary) -> PunchOutcome {
        if let Some(code) = summary.system_error_code {
            let message = system_error_message(code);
            error!(employee_id = %employee_id, code, detail = message, "Remote system error");
            self.throttle.record_attempt(employee_id, None);
            return PunchOutcome::Failed { code, message };
        }

        if let Some(code) = summary.punch_exception {
            let message = exceptions::lookup(code);
            info!(
                employee_id = %employee_id,
                code,
                detail = message.english,
                severity = %message.severity,
                "Punch exception"
            );
            if code == NOT_AUTHORIZED {
                warn!(
                    employee_id = %employee_id,
                    "Not-authorized rejection; may indicate an invalid badge id"
                );
            }
            self.throttle.record_attempt(employee_id, Some(code));
            return PunchOutcome::Rejected {
                code,
                message,
                throttled: false,
            };
        }

        self.throttle.record_attempt(employee_id, None);

        if !summary.punch_success {
            // The service answered but recorded nothing and gave no code.
            error!(employee_id = %employee_id, "Punch not recorded and no code returned");
            return PunchOutcome::Failed {
                code: 0,
                message: "Punch not recorded",
            };
        }

        let outcome = PunchOutcome::Accepted {
            punch_type: summary.punch_type.clone().unwrap_or_default(),
            first_name: summary.first_name.clone().unwrap_or_default(),
            last_name: summary.last_name.clone().unwrap_or_default(),
            weekly_hours: summary.weekly_hours,
        };
        info!(
            employee_id = %employee_id,
            punch_type = summary.punch_type.as_deref().unwrap_or(""),
            last_name = summary.last_name.as_deref().unwrap_or(""),
            first_name = summary.first_name.as_deref().unwrap_or(""),
            weekly_hours = ?summary.weekly_hours,
            "Punch response"
        );
        outcome
    }

    /// Queue the punch locally, saving the photo backup first so the
    /// record can reference it. A failed photo write downgrades to a
    /// punch without an image; a failed queue write is a hard error.
    fn store_offline(
        &self,
        employee_id: &str,
        punch_time: NaiveDateTime,
        photo: Option<&[u8]>,
    ) -> Result<PunchOutcome> {
        let mut image_filename = None;
        if let Some(bytes) = photo {
            let name = PhotoStore::file_name(employee_id, punch_time);
            match self.photos.save_backup(&name, bytes) {
                Ok(path) => {
                    debug!(path = %path.display(), "Saved photo backup for offline punch");
                    image_filename = Some(name);
                }
                Err(e) => {
                    warn!(error = %e, "Photo backup failed; queuing punch without image");
                }
            }
        }

        let record = self.queue.append(employee_id, punch_time, image_filename)?;
        info!(id = record.id, employee_id = %employee_id, "Punch stored offline");
        Ok(PunchOutcome::StoredOffline {
            record_id: record.id,
        })
    }

    async fn backup_and_upload(&self, employee_id: &str, punch_time: NaiveDateTime, bytes: &[u8]) {
        let name = PhotoStore::file_name(employee_id, punch_time);
        if let Err(e) = self.photos.save_backup(&name, bytes) {
            warn!(file = %name, error = %e, "Photo backup failed");
        }
        // Upload failure is logged inside; the punch itself already stands.
        let _ = self.upload_image(&name, bytes).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_deadline_is_capped_at_eight_seconds() {
        let timeouts = GatewayTimeouts::from_config(30);
        assert_eq!(timeouts.call, Duration::from_secs(8));
        assert_eq!(timeouts.upload, Duration::from_secs(5));
    }

    #[test]
    fn short_budget_wins_over_the_caps() {
        let timeouts = GatewayTimeouts::from_config(3);
        assert_eq!(timeouts.call, Duration::from_secs(3));
        assert_eq!(timeouts.upload, Duration::from_secs(3));
    }
}
