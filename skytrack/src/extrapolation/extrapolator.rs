//! Anchor-based position extrapolation.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;

use crate::geo::destination_point;
use crate::telemetry::TelemetrySample;

/// Anchors at or below this ground speed are held in place.
pub const DEFAULT_MIN_SPEED_KT: f64 = 30.0;

/// Staleness ceiling as a multiple of the poll interval.
pub const DEFAULT_STALENESS_FACTOR: f64 = 2.0;

const KM_PER_NM: f64 = 1.852;
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Extrapolation tunables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtrapolationConfig {
    pub min_speed_kt: f64,
    /// No output once this much time has passed since the anchor arrived.
    pub staleness_ceiling: Duration,
}

impl ExtrapolationConfig {
    /// Derives the ceiling from the expected poll interval.
    pub fn for_poll_interval(poll_interval: Duration, staleness_factor: f64, min_speed_kt: f64) -> Self {
        let factor = if staleness_factor.is_finite() && staleness_factor > 0.0 {
            staleness_factor
        } else {
            DEFAULT_STALENESS_FACTOR
        };
        Self {
            min_speed_kt,
            staleness_ceiling: poll_interval.mul_f64(factor),
        }
    }
}

impl Default for ExtrapolationConfig {
    fn default() -> Self {
        Self::for_poll_interval(
            Duration::from_secs(15),
            DEFAULT_STALENESS_FACTOR,
            DEFAULT_MIN_SPEED_KT,
        )
    }
}

/// Extrapolation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtrapolationState {
    /// No anchor yet.
    Idle,
    /// Holding a real sample; nothing derived since it arrived.
    Anchored,
    /// Emitting derived samples from the anchor.
    Extrapolating,
    /// Anchor too old to extrapolate from.
    Suspended,
}

impl ExtrapolationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtrapolationState::Idle => "idle",
            ExtrapolationState::Anchored => "anchored",
            ExtrapolationState::Extrapolating => "extrapolating",
            ExtrapolationState::Suspended => "suspended",
        }
    }
}

impl fmt::Display for ExtrapolationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Anchor {
    sample: TelemetrySample,
    received_at: Instant,
}

/// Dead-reckons from the latest real sample.
#[derive(Debug)]
pub struct Extrapolator {
    config: ExtrapolationConfig,
    anchor: Option<Anchor>,
    state: ExtrapolationState,
}

impl Extrapolator {
    pub fn new(config: ExtrapolationConfig) -> Self {
        Self {
            config,
            anchor: None,
            state: ExtrapolationState::Idle,
        }
    }

    pub fn config(&self) -> &ExtrapolationConfig {
        &self.config
    }

    pub fn state(&self) -> ExtrapolationState {
        self.state
    }

    /// The current anchor, if any.
    pub fn anchor(&self) -> Option<&TelemetrySample> {
        self.anchor.as_ref().map(|a| &a.sample)
    }

    /// Installs a new real sample and resets the extrapolation clock.
    ///
    /// Derived samples are rejected; returns whether the anchor was replaced.
    pub fn set_anchor(&mut self, sample: TelemetrySample, now: Instant) -> bool {
        if sample.is_derived() {
            tracing::warn!("Ignoring derived sample offered as anchor");
            return false;
        }
        self.anchor = Some(Anchor {
            sample,
            received_at: now,
        });
        self.transition(ExtrapolationState::Anchored);
        true
    }

    /// Drops the anchor and returns to idle.
    pub fn clear(&mut self) {
        self.anchor = None;
        self.transition(ExtrapolationState::Idle);
    }

    /// Produces the derived position for `now`, if extrapolation applies.
    pub fn tick(&mut self, now: Instant) -> Option<TelemetrySample> {
        let (speed_kt, elapsed) = {
            let anchor = self.anchor.as_ref()?;
            (
                anchor.sample.ground_speed_kt(),
                now.saturating_duration_since(anchor.received_at),
            )
        };

        if speed_kt <= self.config.min_speed_kt {
            self.transition(ExtrapolationState::Anchored);
            return None;
        }
        if elapsed >= self.config.staleness_ceiling {
            self.transition(ExtrapolationState::Suspended);
            return None;
        }

        let derived = {
            let sample = &self.anchor.as_ref()?.sample;
            let km_per_ms = speed_kt * KM_PER_NM / MS_PER_HOUR;
            let distance_km = km_per_ms * elapsed.as_millis() as f64;

            let position =
                match destination_point(&sample.position(), sample.heading_deg(), distance_km) {
                    Ok(p) => p,
                    Err(e) => {
                        tracing::warn!(error = %e, "Extrapolation projection failed");
                        return None;
                    }
                };
            let captured_at = sample.captured_at()
                + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());

            sample.derive(position, captured_at)
        };

        self.transition(ExtrapolationState::Extrapolating);
        Some(derived)
    }

    fn transition(&mut self, to: ExtrapolationState) {
        if self.state != to {
            tracing::trace!(from = %self.state, to = %to, "Extrapolation state change");
            self.state = to;
        }
    }
}
