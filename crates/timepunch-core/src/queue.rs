//! Durable offline punch queue.
//!
//! Punches captured while the remote service is unreachable land here and
//! are replayed later by the sync reconciler. The queue is a single JSON
//! array on disk, rewritten whole on every mutation through a
//! tmp-write + fsync + atomic-rename sequence so the file is always one
//! complete version, even across a power cut. Kiosks run one process;
//! a process-internal mutex serializes the background tasks against
//! foreground punches.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Punch type recorded for queued punches. Online punches instead report
/// the remote service's `checkin`/`checkout`.
pub const OFFLINE_PUNCH_TYPE: &str = "OFFLINE";

/// A punch captured while offline.
///
/// Field names on disk are camelCase, matching the historical queue files
/// already present on deployed kiosks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PunchRecord {
    /// Assigned at append time as `len + 1`; never reused or reassigned.
    pub id: u64,
    pub employee_id: String,
    /// Moment the badge was presented, not the queue-write time.
    pub punch_time: NaiveDateTime,
    pub punch_type: String,
    /// Local photo backup filename, when a photo was captured.
    #[serde(default)]
    pub image_filename: Option<String>,
    /// Flips false -> true exactly once, by the sync reconciler.
    pub synced: bool,
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<NaiveDateTime>,
}

/// File-backed queue of offline punches.
pub struct OfflineQueue {
    path: PathBuf,
    max_records: usize,
    /// Serializes load-mutate-rewrite cycles; the whole-file rewrite is
    /// not safe under concurrent writers.
    lock: Mutex<()>,
}

impl OfflineQueue {
    /// Open a queue at the given path, creating the parent directory.
    pub fn open(path: impl Into<PathBuf>, max_records: usize) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    Error::Storage(format!(
                        "Failed to create queue directory {}: {}",
                        dir.display(),
                        e
                    ))
                })?;
            }
        }
        Ok(Self {
            path,
            max_records,
            lock: Mutex::new(()),
        })
    }

    /// Append a new unsynced punch. Returns the stored record.
    pub fn append(
        &self,
        employee_id: &str,
        punch_time: NaiveDateTime,
        image_filename: Option<String>,
    ) -> Result<PunchRecord> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut records = self.load()?;

        let record = PunchRecord {
            id: records.len() as u64 + 1,
            employee_id: employee_id.to_string(),
            punch_time,
            punch_type: OFFLINE_PUNCH_TYPE.to_string(),
            image_filename,
            synced: false,
            created_at: Local::now().naive_local(),
            synced_at: None,
        };
        records.push(record.clone());

        let unsynced = records.iter().filter(|r| !r.synced).count();
        if unsynced > self.max_records {
            warn!(
                unsynced,
                max = self.max_records,
                "Offline queue exceeds configured record cap"
            );
        }

        self.persist(&records)?;
        debug!(id = record.id, employee_id = %record.employee_id, "Stored offline punch");
        Ok(record)
    }

    /// All unsynced punches, oldest punch first.
    pub fn unsynced_records(&self) -> Result<Vec<PunchRecord>> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut records: Vec<PunchRecord> = self
            .load()?
            .into_iter()
            .filter(|r| !r.synced)
            .collect();
        records.sort_by_key(|r| r.punch_time);
        Ok(records)
    }

    /// Mark a punch as synced. Unknown ids are logged and ignored.
    pub fn mark_synced(&self, id: u64) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let mut records = self.load()?;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.synced = true;
                record.synced_at = Some(Local::now().naive_local());
            }
            None => {
                warn!(id, "mark_synced: no such punch record");
                return Ok(());
            }
        }
        self.persist(&records)
    }

    /// Delete records whose creation day is older than the retention
    /// window. Returns the number deleted; calling twice without
    /// intervening appends deletes nothing the second time.
    pub fn cleanup_older_than(&self, retention_days: i64) -> Result<usize> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        let records = self.load()?;
        let cutoff = Local::now().date_naive() - Duration::days(retention_days);

        let kept: Vec<PunchRecord> = records
            .iter()
            .filter(|r| r.created_at.date() > cutoff)
            .cloned()
            .collect();
        let deleted = records.len() - kept.len();

        if deleted > 0 {
            self.persist(&kept)?;
        }
        Ok(deleted)
    }

    /// Total number of records on disk, synced or not.
    pub fn len(&self) -> Result<usize> {
        let _guard = self.lock.lock().map_err(|_| poisoned())?;
        Ok(self.load()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn load(&self) -> Result<Vec<PunchRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::Storage(format!(
                "Failed to read queue file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        // A corrupt file is a hard error: treating it as empty would let
        // the next rewrite destroy every queued punch.
        serde_json::from_str(&data).map_err(|e| {
            Error::Storage(format!(
                "Queue file {} is not parseable: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn persist(&self, records: &[PunchRecord]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::Builder::new()
            .prefix("punches_")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| {
                Error::Storage(format!(
                    "Failed to create temp file in {}: {}",
                    dir.display(),
                    e
                ))
            })?;

        let json = serde_json::to_vec_pretty(records)?;
        tmp.write_all(&json)
            .and_then(|()| tmp.flush())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::Storage(format!("Failed to write queue temp file: {}", e)))?;

        tmp.persist(&self.path).map_err(|e| {
            Error::Storage(format!(
                "Failed to replace queue file {}: {}",
                self.path.display(),
                e.error
            ))
        })?;
        Ok(())
    }
}

fn poisoned() -> Error {
    Error::Storage("Queue lock poisoned".into())
}
