//! Request rate limiting.

use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::store::CounterStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited,
}

pub trait RateLimiter: Send + Sync {
    /// Check and count a request for `key`. `Allowed` implies the request
    /// was recorded against the current window.
    fn check(&self, key: &str) -> RateLimitDecision;
}

#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _key: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed
    }
}

/// Fixed-window counter per key: the first request opens a window, later
/// requests increment until `max_requests`, and a request after the window
/// has elapsed starts a fresh one.
pub struct SlidingWindowRateLimiter {
    store: Arc<dyn CounterStore>,
    max_requests: u64,
    window: Duration,
}

impl SlidingWindowRateLimiter {
    #[must_use]
    pub fn new(store: Arc<dyn CounterStore>, max_requests: u64, window: Duration) -> Self {
        Self {
            store,
            max_requests,
            window,
        }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }
}

impl RateLimiter for SlidingWindowRateLimiter {
    fn check(&self, key: &str) -> RateLimitDecision {
        match self.store.increment(key, self.window) {
            Ok(count) if count > self.max_requests => RateLimitDecision::Limited,
            Ok(_) => RateLimitDecision::Allowed,
            Err(err) => {
                // Deliberate asymmetry with the auth checks: the limiter is a
                // secondary protection, so counter-store faults fail open.
                error!("rate limit counter unavailable, allowing request: {err:#}");
                RateLimitDecision::Allowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCounterStore;
    use anyhow::Result;

    struct BrokenCounterStore;

    impl CounterStore for BrokenCounterStore {
        fn increment(&self, _key: &str, _window: Duration) -> Result<u64> {
            anyhow::bail!("counter store down")
        }
    }

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert_eq!(limiter.check("10.0.0.1|anonymous"), RateLimitDecision::Allowed);
    }

    #[test]
    fn window_allows_up_to_max_then_limits() {
        let limiter = SlidingWindowRateLimiter::new(
            Arc::new(MemoryCounterStore::new()),
            3,
            Duration::from_secs(60),
        );

        for _ in 0..3 {
            assert_eq!(limiter.check("k"), RateLimitDecision::Allowed);
        }
        assert_eq!(limiter.check("k"), RateLimitDecision::Limited);
        // Another key is unaffected.
        assert_eq!(limiter.check("other"), RateLimitDecision::Allowed);
    }

    #[test]
    fn new_window_opens_after_elapse() {
        let limiter = SlidingWindowRateLimiter::new(
            Arc::new(MemoryCounterStore::new()),
            1,
            Duration::from_millis(20),
        );

        assert_eq!(limiter.check("k"), RateLimitDecision::Allowed);
        assert_eq!(limiter.check("k"), RateLimitDecision::Limited);
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(limiter.check("k"), RateLimitDecision::Allowed);
    }

    #[test]
    fn counter_store_failure_fails_open() {
        let limiter =
            SlidingWindowRateLimiter::new(Arc::new(BrokenCounterStore), 1, Duration::from_secs(60));
        assert_eq!(limiter.check("k"), RateLimitDecision::Allowed);
    }
}
