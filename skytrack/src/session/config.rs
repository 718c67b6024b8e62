//! Per-session configuration.

use std::time::Duration;

use crate::extrapolation::{ExtrapolationConfig, DEFAULT_MIN_SPEED_KT, DEFAULT_STALENESS_FACTOR};
use crate::telemetry::DEFAULT_HISTORY_CAPACITY;

use super::BackoffPolicy;

/// Default interval between resolutions.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Shortest poll interval a session will use.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default cadence of derived position updates.
pub const DEFAULT_ANIMATION_TICK: Duration = Duration::from_millis(250);

/// Configuration for one tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Delay between successful resolutions. Clamped to [`MIN_POLL_INTERVAL`].
    pub poll_interval: Duration,
    /// Cadence of the extrapolation loop.
    pub animation_tick: Duration,
    /// Anchors at or below this speed are not extrapolated.
    pub min_speed_kt: f64,
    /// Extrapolation stops after `staleness_factor * poll_interval`.
    pub staleness_factor: f64,
    /// Samples kept for trail rendering.
    pub history_capacity: usize,
    pub backoff: BackoffPolicy,
    /// Quota key charged for this session's resolutions. Defaults to the session id.
    pub caller_key: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            animation_tick: DEFAULT_ANIMATION_TICK,
            min_speed_kt: DEFAULT_MIN_SPEED_KT,
            staleness_factor: DEFAULT_STALENESS_FACTOR,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            backoff: BackoffPolicy::default(),
            caller_key: None,
        }
    }
}

impl SessionConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_animation_tick(mut self, animation_tick: Duration) -> Self {
        self.animation_tick = animation_tick;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    pub fn with_caller_key(mut self, key: impl Into<String>) -> Self {
        self.caller_key = Some(key.into());
        self
    }

    pub fn extrapolation(&self) -> ExtrapolationConfig {
        ExtrapolationConfig::for_poll_interval(
            self.poll_interval,
            self.staleness_factor,
            self.min_speed_kt,
        )
    }
}
