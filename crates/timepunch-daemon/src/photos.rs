//! Local punch photo backups.
//!
//! Photos are saved beside the queue so an offline punch can upload its
//! image later under the same filename the punch was logged with. The
//! punch record is authoritative; photos are best-effort.

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::warn;

/// Photo backup directory plus the remote upload directory (tenant id).
pub struct PhotoStore {
    dir: PathBuf,
    client_dir: String,
}

impl PhotoStore {
    pub fn new(dir: impl Into<PathBuf>, client_id: u32) -> Self {
        Self {
            dir: dir.into(),
            client_dir: client_id.to_string(),
        }
    }

    /// Remote upload directory, the stringified tenant id.
    pub fn client_dir(&self) -> &str {
        &self.client_dir
    }

    /// Upload filename for a punch: `"{id}__{YYYYMMDD_HHMMSS}.jpg"`.
    ///
    /// Badge ids may carry a 2-letter site prefix that the photo service
    /// does not know about; it is stripped here so filenames correlate
    /// with the employee record.
    pub fn file_name(employee_id: &str, punch_time: NaiveDateTime) -> String {
        format!(
            "{}__{}.jpg",
            strip_badge_prefix(employee_id),
            punch_time.format("%Y%m%d_%H%M%S")
        )
    }

    /// Write a photo backup, creating the directory on first use.
    pub fn save_backup(&self, file_name: &str, data: &[u8]) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        std::fs::write(&path, data)?;
        Ok(path)
    }

    pub fn backup_exists(&self, file_name: &str) -> bool {
        self.dir.join(file_name).exists()
    }

    /// Read a photo backup; a missing or unreadable file is logged and
    /// reported as absent.
    pub fn read_backup(&self, file_name: &str) -> Option<Vec<u8>> {
        let path = self.dir.join(file_name);
        if !path.exists() {
            return None;
        }
        match std::fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read photo backup");
                None
            }
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Strip a leading 2-letter site prefix from a badge id. Only fires on
/// exactly two ASCII alphabetic characters followed by the numeric id.
fn strip_badge_prefix(employee_id: &str) -> &str {
    let bytes = employee_id.as_bytes();
    if bytes.len() > 2 && bytes[0].is_ascii_alphabetic() && bytes[1].is_ascii_alphabetic() {
        &employee_id[2..]
    } else {
        employee_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn punch_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 5, 30)
            .unwrap()
    }

    #[test]
    fn file_name_matches_upload_pattern() {
        assert_eq!(
            PhotoStore::file_name("12345", punch_time()),
            "12345__20240115_080530.jpg"
        );
    }

    #[test]
    fn badge_prefix_is_stripped() {
        assert_eq!(
            PhotoStore::file_name("AB12345", punch_time()),
            "12345__20240115_080530.jpg"
        );
    }

    #[test]
    fn numeric_and_short_ids_are_untouched() {
        assert_eq!(strip_badge_prefix("12345"), "12345");
        assert_eq!(strip_badge_prefix("AB"), "AB");
        assert_eq!(strip_badge_prefix("A2345"), "A2345");
    }

    #[test]
    fn save_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path().join("photos"), 42);

        let name = PhotoStore::file_name("12345", punch_time());
        store.save_backup(&name, b"\xff\xd8jpeg").unwrap();

        assert!(store.backup_exists(&name));
        assert_eq!(store.read_backup(&name).unwrap(), b"\xff\xd8jpeg");
        assert_eq!(store.client_dir(), "42");
    }

    #[test]
    fn missing_backup_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = PhotoStore::new(dir.path(), 1);
        assert!(!store.backup_exists("nope.jpg"));
        assert!(store.read_backup("nope.jpg").is_none());
    }
}
