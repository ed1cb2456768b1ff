//! Fixed-window rate limiting for summarization calls.
//!
//! Every accepted request consumes quota from a per-key window. When the window
//! has run for its full duration it is reset in the same critical section as the
//! check, so concurrent callers can never push a window past its cap.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::warn;

use crate::core::config::AppConfig;
use crate::errors::AnalyzeError;

/// Key shared by every request when limiting is process-wide.
pub const GLOBAL_KEY: &str = "global";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    pub window_start: Instant,
    pub count: u32,
}

/// Backing storage for rate windows.
///
/// `try_acquire` must perform the reset, the comparison and the increment as
/// one atomic step for a given key.
pub trait RateLimitStore: Send + Sync {
    /// Returns `Err(wait)` with the time left in the window when the call is rejected.
    fn try_acquire(
        &self,
        key: &str,
        cost: u32,
        max_requests: u32,
        window: Duration,
        now: Instant,
    ) -> Result<(), Duration>;

    /// Forgets every window.
    fn reset(&self);
}

/// In-process store: a map of windows behind a single mutex.
#[derive(Debug, Default)]
pub struct InMemoryRateLimitStore {
    windows: Mutex<HashMap<String, RateWindow>>,
}

impl InMemoryRateLimitStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current window for `key`, if one has been opened.
    #[must_use]
    pub fn window(&self, key: &str) -> Option<RateWindow> {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .copied()
    }
}

impl RateLimitStore for InMemoryRateLimitStore {
    fn try_acquire(
        &self,
        key: &str,
        cost: u32,
        max_requests: u32,
        window: Duration,
        now: Instant,
    ) -> Result<(), Duration> {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = windows.entry(key.to_string()).or_insert(RateWindow {
            window_start: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.window_start);
        if elapsed >= window {
            entry.window_start = now;
            entry.count = 0;
        }

        if entry.count.saturating_add(cost) > max_requests {
            let elapsed = now.saturating_duration_since(entry.window_start);
            return Err(window.saturating_sub(elapsed));
        }

        entry.count += cost;
        Ok(())
    }

    fn reset(&self) {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Process-wide limiter shared by all concurrent requests.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self::with_store(Arc::new(InMemoryRateLimitStore::new()), max_requests, window)
    }

    #[must_use]
    pub fn with_store(store: Arc<dyn RateLimitStore>, max_requests: u32, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rate_limit_max_requests, config.rate_limit_window)
    }

    #[must_use]
    pub const fn max_requests(&self) -> u32 {
        self.max_requests
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Accepts or rejects one call of the given cost against `key`.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` when the current window has no room left.
    pub fn check(&self, key: &str, cost: u32) -> Result<(), AnalyzeError> {
        self.check_at(key, cost, Instant::now())
    }

    /// Same as [`check`](Self::check) with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// Returns `RateLimitExceeded` when the window at `now` has no room left.
    pub fn check_at(&self, key: &str, cost: u32, now: Instant) -> Result<(), AnalyzeError> {
        self.store
            .try_acquire(key, cost, self.max_requests, self.window, now)
            .map_err(|retry_after| {
                warn!(
                    key,
                    retry_after_secs = retry_after.as_secs(),
                    max_requests = self.max_requests,
                    "Rate limit exceeded"
                );
                AnalyzeError::RateLimitExceeded { retry_after }
            })
    }

    pub fn reset(&self) {
        self.store.reset();
    }
}
