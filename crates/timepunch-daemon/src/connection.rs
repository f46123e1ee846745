//! Connection state for the remote swipe service.
//!
//! Tracks online/offline plus the last error string, and owns the
//! reconnect probe. Every gateway attempt updates this state; the
//! background reconnect task probes it back to life while offline.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use crate::remote::SwipeApi;

#[derive(Debug, Default)]
struct StateInner {
    online: bool,
    last_error: Option<String>,
}

/// Shared online/offline state with probe-driven reconnect.
pub struct Connection {
    api: Arc<dyn SwipeApi>,
    state: Mutex<StateInner>,
}

impl Connection {
    /// A new connection starts offline; the first successful probe or
    /// punch flips it online.
    pub fn new(api: Arc<dyn SwipeApi>) -> Self {
        Self {
            api,
            state: Mutex::new(StateInner::default()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Mark the service reachable and clear the error.
    pub fn set_online(&self) {
        let mut state = self.lock();
        state.online = true;
        state.last_error = None;
    }

    /// Mark the service unreachable with a descriptive error.
    pub fn set_offline(&self, error: impl Into<String>) {
        let mut state = self.lock();
        state.online = false;
        state.last_error = Some(error.into());
    }

    /// Probe the remote service. Online is declared only when both
    /// required operations are reachable.
    pub async fn try_reconnect(&self) -> bool {
        info!("Attempting to reconnect to remote swipe service");
        match self.api.probe().await {
            Ok(()) => {
                self.set_online();
                info!("Successfully connected to remote swipe service");
                true
            }
            Err(e) => {
                warn!(error = %e, "Connection probe failed");
                self.set_offline(e.to_string());
                false
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateInner> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::{RemoteError, SwipeSummary};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeApi {
        probe_ok: AtomicBool,
    }

    #[async_trait]
    impl SwipeApi for FakeApi {
        async fn record_swipe_summary(&self, _: &str) -> Result<SwipeSummary, RemoteError> {
            Ok(SwipeSummary::default())
        }
        async fn record_swipe_summary_department_override(
            &self,
            _: &str,
        ) -> Result<SwipeSummary, RemoteError> {
            Ok(SwipeSummary::default())
        }
        async fn save_image(&self, _: &str, _: &[u8], _: &str) -> Result<(), RemoteError> {
            Ok(())
        }
        async fn probe(&self) -> Result<(), RemoteError> {
            if self.probe_ok.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(RemoteError::Probe("no route to host".into()))
            }
        }
    }

    #[test]
    fn starts_offline_with_no_error() {
        let api = Arc::new(FakeApi {
            probe_ok: AtomicBool::new(true),
        });
        let conn = Connection::new(api);
        assert!(!conn.is_online());
        assert!(conn.last_error().is_none());
    }

    #[tokio::test]
    async fn successful_probe_goes_online() {
        let api = Arc::new(FakeApi {
            probe_ok: AtomicBool::new(true),
        });
        let conn = Connection::new(api);
        assert!(conn.try_reconnect().await);
        assert!(conn.is_online());
        assert!(conn.last_error().is_none());
    }

    #[tokio::test]
    async fn failed_probe_records_the_error() {
        let api = Arc::new(FakeApi {
            probe_ok: AtomicBool::new(false),
        });
        let conn = Connection::new(api);
        assert!(!conn.try_reconnect().await);
        assert!(!conn.is_online());
        let err = conn.last_error().unwrap_or_default();
        assert!(err.contains("no route to host"));
    }

    #[test]
    fn set_online_clears_error() {
        let api = Arc::new(FakeApi {
            probe_ok: AtomicBool::new(true),
        });
        let conn = Connection::new(api);
        conn.set_offline("timed out");
        assert_eq!(conn.last_error().as_deref(), Some("timed out"));
        conn.set_online();
        assert!(conn.is_online());
        assert!(conn.last_error().is_none());
    }
}
