//! Per-employee punch throttle.
//!
//! A card reader or keypad can fire duplicate swipes within a second or
//! two. Retrying a definitive not-authorized rejection against the backend
//! wastes bandwidth and can trip its rate limits, so repeats inside a
//! short window are answered from the cached rejection instead.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use timepunch_core::exceptions::NOT_AUTHORIZED;

/// Production throttle window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
struct ThrottleEntry {
    last_attempt: Instant,
    last_exception: Option<i32>,
}

/// Short-circuit cache keyed by employee id. Owned by the gateway that
/// created it; there is no cross-instance state.
pub struct PunchThrottle {
    window: Duration,
    entries: Mutex<HashMap<String, ThrottleEntry>>,
}

impl PunchThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a swipe for this employee should be answered from the
    /// cached rejection: the previous attempt was inside the window and
    /// ended in a not-authorized rejection.
    pub fn is_throttled(&self, employee_id: &str) -> bool {
        let entries = self.lock();
        match entries.get(employee_id) {
            Some(entry) => {
                entry.last_attempt.elapsed() < self.window
                    && entry.last_exception == Some(NOT_AUTHORIZED)
            }
            None => false,
        }
    }

    /// Record the outcome of an attempt, overwriting any previous entry.
    pub fn record_attempt(&self, employee_id: &str, exception: Option<i32>) {
        self.lock().insert(
            employee_id.to_string(),
            ThrottleEntry {
                last_attempt: Instant::now(),
                last_exception: exception,
            },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, ThrottleEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PunchThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}
