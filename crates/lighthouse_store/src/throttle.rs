//! Per-lighthouse refresh throttle.
//!
//! At most one accepted call per key per window; calls inside the window
//! are dropped, never queued. Backed by a keyed `governor` limiter with a
//! burst of one.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter as GovLimiter};

type KeyedLimiter = GovLimiter<
    String,
    governor::state::keyed::DefaultKeyedStateStore<String>,
    governor::clock::DefaultClock,
>;

#[derive(Clone)]
pub struct RefreshThrottle {
    /// `None` when the window is zero: every call is accepted.
    limiter: Option<Arc<KeyedLimiter>>,
    window: Duration,
}

impl fmt::Debug for RefreshThrottle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshThrottle")
            .field("window", &self.window)
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}

impl RefreshThrottle {
    pub fn new(window: Duration) -> Self {
        let limiter = Quota::with_period(window).map(|quota| Arc::new(GovLimiter::keyed(quota)));
        Self { limiter, window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a call for `key`; true if it falls outside the current window.
    pub fn try_acquire(&self, key: &str) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&key.to_string()).is_ok(),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_call_per_window_per_key() {
        let throttle = RefreshThrottle::new(Duration::from_secs(60));

        assert!(throttle.try_acquire("1"));
        assert!(!throttle.try_acquire("1"));
        assert!(!throttle.try_acquire("1"));

        // Other keys have their own window.
        assert!(throttle.try_acquire("2"));
        assert!(!throttle.try_acquire("2"));
    }

    #[test]
    fn test_window_reopens_after_expiry() {
        let throttle = RefreshThrottle::new(Duration::from_millis(50));

        assert!(throttle.try_acquire("1"));
        assert!(!throttle.try_acquire("1"));

        std::thread::sleep(Duration::from_millis(120));
        assert!(throttle.try_acquire("1"));
    }

    #[test]
    fn test_zero_window_never_throttles() {
        let throttle = RefreshThrottle::new(Duration::ZERO);
        assert!(throttle.try_acquire("1"));
        assert!(throttle.try_acquire("1"));
        assert_eq!(throttle.window(), Duration::ZERO);
    }
}
