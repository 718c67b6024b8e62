//! Sliding-window rate limiter.
//!
//! A key is admitted when either:
//!
//! - the window has elapsed since `window_start` (counters reset), or
//! - `count_in_window < max_per_window` **and** `now - last_request_at >= min_interval`.
//!
//! Rejected requests do not touch the stored state, so hammering a limited key
//! never extends its own penalty.
//!
//! Keys whose window has elapsed are swept at most once per window from the
//! admission path, so one-off callers do not accumulate.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;

/// Quota for one class of keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests admitted per window (at least one).
    pub max_per_window: u32,
    /// Window length.
    pub window: Duration,
    /// Minimum spacing between two admitted requests.
    pub min_interval: Duration,
}

impl RateLimitConfig {
    pub fn new(max_per_window: u32, window: Duration, min_interval: Duration) -> Self {
        Self {
            max_per_window,
            window,
            min_interval,
        }
    }

    /// A quota that never rejects anything in practice.
    pub fn unlimited() -> Self {
        Self {
            max_per_window: u32::MAX,
            window: Duration::from_secs(1),
            min_interval: Duration::ZERO,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_window: 30,
            window: Duration::from_secs(60),
            min_interval: Duration::from_secs(1),
        }
    }
}

/// Per-key limiter state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub window_start: Instant,
    pub count_in_window: u32,
    pub last_request_at: Instant,
}

impl RateLimitState {
    fn fresh(now: Instant) -> Self {
        Self {
            window_start: now,
            count_in_window: 1,
            last_request_at: now,
        }
    }
}

/// A request was rejected; the caller may retry after `retry_after`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rate limited on '{key}', retry after {}ms", .retry_after.as_millis())]
pub struct RateLimited {
    pub key: String,
    pub retry_after: Duration,
}

/// Per-key sliding-window rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    states: DashMap<String, RateLimitState>,
    last_sweep: Mutex<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: RateLimitConfig {
                max_per_window: config.max_per_window.max(1),
                ..config
            },
            states: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admits or rejects a request for `key` now.
    pub fn check(&self, key: &str) -> Result<(), RateLimited> {
        self.check_at(key, Instant::now())
    }

    /// Admits or rejects a request for `key` at an explicit instant.
    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), RateLimited> {
        self.sweep_if_due(now);

        match self.states.entry(key.to_string()) {
            Entry::Vacant(entry) => {
                entry.insert(RateLimitState::fresh(now));
                Ok(())
            }
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();

                if now.saturating_duration_since(state.window_start) >= self.config.window {
                    *state = RateLimitState::fresh(now);
                    return Ok(());
                }

                let since_last = now.saturating_duration_since(state.last_request_at);
                if state.count_in_window < self.config.max_per_window
                    && since_last >= self.config.min_interval
                {
                    state.count_in_window += 1;
                    state.last_request_at = now;
                    return Ok(());
                }

                let retry_after = if state.count_in_window >= self.config.max_per_window {
                    (state.window_start + self.config.window).saturating_duration_since(now)
                } else {
                    self.config.min_interval - since_last
                };

                tracing::debug!(
                    key,
                    count = state.count_in_window,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Request rate limited"
                );
                Err(RateLimited {
                    key: key.to_string(),
                    retry_after,
                })
            }
        }
    }

    /// Current state for `key`, if any request was ever admitted.
    pub fn state(&self, key: &str) -> Option<RateLimitState> {
        self.states.get(key).map(|s| *s)
    }

    /// Forgets `key` entirely.
    pub fn reset(&self, key: &str) {
        self.states.remove(key);
    }

    /// Drops state whose window has elapsed. Returns the number removed.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let before = self.states.len();
        let window = self.config.window;
        self.states
            .retain(|_, s| now.saturating_duration_since(s.window_start) < window);
        before - self.states.len()
    }

    /// Prunes expired keys when a full window has passed since the last sweep.
    ///
    /// Must not run while a map entry is held.
    fn sweep_if_due(&self, now: Instant) {
        {
            let mut last = self.last_sweep.lock();
            if now.saturating_duration_since(*last) < self.config.window {
                return;
            }
            *last = now;
        }

        let removed = self.prune_expired(now);
        if removed > 0 {
            tracing::trace!(removed, remaining = self.states.len(), "Swept idle rate limit keys");
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, window_secs: u64, min_interval_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig::new(
            max,
            Duration::from_secs(window_secs),
            Duration::from_millis(min_interval_ms),
        ))
    }

    #[test]
    fn test_fourth_request_in_window_rejected() {
        let rl = limiter(3, 60, 0);
        let t0 = Instant::now();

        assert!(rl.check_at("k", t0).is_ok());
        assert!(rl.check_at("k", t0 + Duration::from_secs(1)).is_ok());
        assert!(rl.check_at("k", t0 + Duration::from_secs(2)).is_ok());

        let err = rl.check_at("k", t0 + Duration::from_secs(3)).unwrap_err();
        assert_eq!(err.key, "k");
        assert_eq!(err.retry_after, Duration::from_secs(57));
    }

    #[test]
    fn test_next_window_accepts() {
        let rl = limiter(3, 60, 0);
        let t0 = Instant::now();
        for i in 0..3 {
            rl.check_at("k", t0 + Duration::from_secs(i)).unwrap();
        }
        assert!(rl.check_at("k", t0 + Duration::from_secs(30)).is_err());

        assert!(rl.check_at("k", t0 + Duration::from_secs(60)).is_ok());
        let state = rl.state("k").unwrap();
        assert_eq!(state.count_in_window, 1);
        assert_eq!(state.window_start, t0 + Duration::from_secs(60));
    }

    #[test]
    fn test_min_interval_enforced() {
        let rl = limiter(10, 60, 1000);
        let t0 = Instant::now();

        assert!(rl.check_at("k", t0).is_ok());
        let err = rl.check_at("k", t0 + Duration::from_millis(300)).unwrap_err();
        assert_eq!(err.retry_after, Duration::from_millis(700));
        assert!(rl.check_at("k", t0 + Duration::from_millis(1000)).is_ok());
    }

    #[test]
    fn test_rejection_does_not_update_state() {
        let rl = limiter(10, 60, 1000);
        let t0 = Instant::now();
        rl.check_at("k", t0).unwrap();
        let before = rl.state("k").unwrap();

        let _ = rl.check_at("k", t0 + Duration::from_millis(500));
        assert_eq!(rl.state("k").unwrap(), before);
    }

    #[test]
    fn test_keys_are_independent() {
        let rl = limiter(1, 60, 0);
        let t0 = Instant::now();
        assert!(rl.check_at("a", t0).is_ok());
        assert!(rl.check_at("b", t0).is_ok());
        assert!(rl.check_at("a", t0).is_err());
    }

    #[test]
    fn test_zero_max_clamped_to_one() {
        let rl = limiter(0, 60, 0);
        let t0 = Instant::now();
        assert!(rl.check_at("k", t0).is_ok());
        assert!(rl.check_at("k", t0).is_err());
    }

    #[test]
    fn test_prune_expired() {
        let rl = limiter(3, 60, 0);
        let t0 = Instant::now();
        rl.check_at("old", t0).unwrap();
        rl.check_at("new", t0 + Duration::from_secs(50)).unwrap();

        assert_eq!(rl.prune_expired(t0 + Duration::from_secs(61)), 1);
        assert!(rl.state("old").is_none());
        assert!(rl.state("new").is_some());
    }

    #[test]
    fn test_idle_keys_swept_on_admission() {
        let rl = limiter(3, 60, 0);
        let t0 = Instant::now();
        for i in 0..1000 {
            rl.check_at(&format!("session-{}", i), t0).unwrap();
        }
        assert_eq!(rl.tracked_keys(), 1000);

        // Within the window nothing is swept.
        rl.check_at("late", t0 + Duration::from_secs(30)).unwrap();
        assert_eq!(rl.tracked_keys(), 1001);

        rl.check_at("session-0", t0 + Duration::from_secs(3600)).unwrap();
        assert_eq!(rl.tracked_keys(), 1);
        assert_eq!(rl.state("session-0").unwrap().count_in_window, 1);
    }

    #[test]
    fn test_reset_forgets_key() {
        let rl = limiter(1, 60, 0);
        let t0 = Instant::now();
        rl.check_at("k", t0).unwrap();
        rl.reset("k");
        assert!(rl.check_at("k", t0).is_ok());
    }

    #[test]
    fn test_error_display() {
        let e = RateLimited {
            key: "session".to_string(),
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(e.to_string(), "rate limited on 'session', retry after 1500ms");
    }
}
