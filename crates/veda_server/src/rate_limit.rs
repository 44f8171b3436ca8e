//! Per-session token-bucket rate limiting in front of the chat handlers.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota};

pub struct SessionRateLimiter {
    inner: DefaultKeyedRateLimiter<String>,
    retry_after_secs: u64,
}

impl SessionRateLimiter {
    /// `max_requests` per `window_seconds`, per session key.
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        let max = NonZeroU32::new(max_requests.max(1)).unwrap_or(NonZeroU32::MIN);
        let replenish = Duration::from_secs(window_seconds.max(1)) / max.get();
        let quota = Quota::with_period(replenish)
            .unwrap_or_else(|| Quota::per_minute(max))
            .allow_burst(max);

        Self {
            inner: DefaultKeyedRateLimiter::keyed(quota),
            retry_after_secs: window_seconds.max(1),
        }
    }

    /// `Ok` admits the request; `Err` carries a retry-after hint in seconds.
    pub fn check(&self, key: &str) -> Result<(), u64> {
        self.inner
            .check_key(&key.to_string())
            .map_err(|_| self.retry_after_secs)
    }
}
