//! Settings resolution for Timepunch.
//!
//! Settings come from a JSON file (the kiosk ships one next to the binary)
//! with built-in defaults for every missing section, then `TIMEPUNCH_*`
//! environment variables on top.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Deadline cap for the punch call, regardless of the configured timeout.
pub const MAX_PUNCH_CALL_SECS: u64 = 8;

/// Deadline cap for the image upload call.
pub const MAX_IMAGE_UPLOAD_SECS: u64 = 5;

/// Complete Timepunch configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote time-tracking service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the remote service; service paths are appended under
    /// `{endpoint}Services/`.
    pub endpoint: String,
    /// Per-call timeout budget in seconds. The punch call is additionally
    /// capped at [`MAX_PUNCH_CALL_SECS`] and uploads at
    /// [`MAX_IMAGE_UPLOAD_SECS`].
    pub timeout_secs: u64,
    pub username: String,
    pub password: String,
    /// Tenant id; doubles as the remote image upload directory.
    pub client_id: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            timeout_secs: 10,
            username: String::new(),
            password: String::new(),
            client_id: 0,
        }
    }
}

/// Local storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON queue file holding punches captured while offline.
    pub queue_path: PathBuf,
    /// Directory for locally backed-up punch photos.
    pub photo_dir: PathBuf,
    /// Queue records older than this many days are purged regardless of
    /// sync state.
    pub retention_days: i64,
    /// Soft cap on unsynced records; appends past it log a warning.
    pub max_offline_records: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            queue_path: PathBuf::from("data/punches.json"),
            photo_dir: PathBuf::from("photos"),
            retention_days: 30,
            max_offline_records: 1000,
        }
    }
}

/// Background task scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Reconnect probe interval while offline (seconds).
    pub reconnect_interval_secs: u64,
    /// Offline queue drain interval (seconds).
    pub sync_interval_secs: u64,
    /// Retention cleanup interval (seconds). Default: daily.
    pub cleanup_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reconnect_interval_secs: 60,
            sync_interval_secs: 300,
            cleanup_interval_secs: 24 * 60 * 60,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load configuration from a settings file, then apply environment
/// overrides. A missing file yields the built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(p) if p.exists() => load_config_file(p)?,
        _ => Config::default(),
    };
    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read settings file {}: {}",
            path.display(),
            e
        ))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse settings file {}: {}",
            path.display(),
            e
        ))
    })
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("TIMEPUNCH_ENDPOINT") {
        config.remote.endpoint = val;
    }
    if let Ok(val) = std::env::var("TIMEPUNCH_USERNAME") {
        config.remote.username = val;
    }
    if let Ok(val) = std::env::var("TIMEPUNCH_PASSWORD") {
        config.remote.password = val;
    }
    if let Ok(val) = std::env::var("TIMEPUNCH_CLIENT_ID") {
        if let Ok(n) = val.parse() {
            config.remote.client_id = n;
        }
    }
    if let Ok(val) = std::env::var("TIMEPUNCH_TIMEOUT_SECS") {
        if let Ok(n) = val.parse() {
            config.remote.timeout_secs = n;
        }
    }
    if let Ok(val) = std::env::var("TIMEPUNCH_QUEUE_PATH") {
        config.storage.queue_path = PathBuf::from(val);
    }
    if let Ok(val) = std::env::var("TIMEPUNCH_LOG_LEVEL") {
        config.logging.level = val;
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.remote.timeout_secs == 0 {
        return Err(Error::Config("remote.timeout_secs must be > 0".into()));
    }
    if config.storage.retention_days <= 0 {
        return Err(Error::Config("storage.retention_days must be > 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_intervals() {
        let config = Config::default();
        assert_eq!(config.sync.reconnect_interval_secs, 60);
        assert_eq!(config.sync.sync_interval_secs, 300);
        assert_eq!(config.sync.cleanup_interval_secs, 86_400);
    }

    #[test]
    fn default_timeout_is_above_the_punch_cap() {
        let config = Config::default();
        assert!(config.remote.timeout_secs >= MAX_PUNCH_CALL_SECS);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/settings.json"))).unwrap();
        assert_eq!(config.storage.retention_days, 30);
        assert_eq!(config.storage.max_offline_records, 1000);
    }

    #[test]
    fn partial_file_fills_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"remote": {"endpoint": "https://clock.example.com/", "timeout_secs": 6,
                "username": "kiosk", "password": "pw", "client_id": 42}}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.remote.endpoint, "https://clock.example.com/");
        assert_eq!(config.remote.client_id, 42);
        // Untouched sections come from defaults
        assert_eq!(config.sync.sync_interval_secs, 300);
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let result = load_config(Some(&path));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"remote": {"endpoint": "x", "timeout_secs": 0,
                "username": "", "password": "", "client_id": 0}}"#,
        )
        .unwrap();

        assert!(matches!(load_config(Some(&path)), Err(Error::Config(_))));
    }
}
