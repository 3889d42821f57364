//! Per-key rate limiting for warning logs.

use lru::LruCache;
use parking_lot::Mutex;
use std::fmt;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Default number of keys tracked before the least recently seen is evicted.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Lets one log line per key through per interval.
///
/// Keys are typically producer identities. The map is bounded; an evicted key
/// simply logs again on its next occurrence.
pub struct RateLimitedLog {
    interval: Duration,
    last_logged: Mutex<LruCache<String, Instant>>,
}

impl fmt::Debug for RateLimitedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedLog")
            .field("interval", &self.interval)
            .field("tracked", &self.tracked())
            .finish()
    }
}

impl RateLimitedLog {
    /// Creates a limiter allowing one line per `interval` per key.
    pub fn new(interval: Duration, capacity: NonZeroUsize) -> Self {
        Self {
            interval,
            last_logged: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Creates a limiter with [`DEFAULT_CAPACITY`].
    pub fn with_interval(interval: Duration) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::new(interval, capacity)
    }

    /// Configured interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns true if a line for `key` may be logged now, and records it.
    pub fn should_log(&self, key: &str) -> bool {
        self.should_log_at(key, Instant::now())
    }

    /// Same as [`should_log`](Self::should_log) with an explicit clock reading.
    pub fn should_log_at(&self, key: &str, now: Instant) -> bool {
        let mut last_logged = self.last_logged.lock();
        if let Some(last) = last_logged.get(key) {
            if now.saturating_duration_since(*last) < self.interval {
                return false;
            }
        }
        last_logged.put(key.to_string(), now);
        true
    }

    /// Number of keys currently tracked.
    pub fn tracked(&self) -> usize {
        self.last_logged.lock().len()
    }
}
