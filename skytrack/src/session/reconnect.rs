//! Reconnect/backoff state machine.
//!
//! # State Machine
//!
//! ```text
//! Disconnected --start--> Connecting --success--> Connected
//! Connecting|Connected --failure/rate limit--> Error --retry--> Connecting
//! any --stop--> Disconnected (terminal)
//! ```
//!
//! Backoff after the n-th consecutive failure is `base * 2^(n-1)`, capped at
//! `max`. Any success resets the counter. Rate limiting moves the machine to
//! `Error` without counting as a failure.

use std::time::Duration;

use thiserror::Error;

use super::ConnectionStatus;

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay after `failures` consecutive failures. Zero failures means no delay.
    pub fn delay_for(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let multiplier = 2u32.saturating_pow((failures - 1).min(31));
        self.base.saturating_mul(multiplier).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(2),
            max: Duration::from_secs(300),
        }
    }
}

/// A transition that the current state does not allow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {event} while {from}")]
    Invalid {
        from: ConnectionStatus,
        event: &'static str,
    },

    #[error("session has been stopped")]
    Stopped,
}

/// Guarded connection lifecycle for one session.
#[derive(Debug)]
pub struct ReconnectMachine {
    status: ConnectionStatus,
    consecutive_failures: u32,
    stopped: bool,
    policy: BackoffPolicy,
}

impl ReconnectMachine {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            consecutive_failures: 0,
            stopped: false,
            policy,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Disconnected → Connecting.
    pub fn start(&mut self) -> Result<(), TransitionError> {
        self.guard("start", &[ConnectionStatus::Disconnected])?;
        self.set(ConnectionStatus::Connecting);
        Ok(())
    }

    /// Connecting|Connected → Connected, resetting the failure counter.
    pub fn on_success(&mut self) -> Result<(), TransitionError> {
        self.guard(
            "record success",
            &[ConnectionStatus::Connecting, ConnectionStatus::Connected],
        )?;
        self.consecutive_failures = 0;
        self.set(ConnectionStatus::Connected);
        Ok(())
    }

    /// Connecting|Connected → Error. Returns the delay before the next attempt.
    pub fn on_failure(&mut self) -> Result<Duration, TransitionError> {
        self.guard(
            "record failure",
            &[ConnectionStatus::Connecting, ConnectionStatus::Connected],
        )?;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.set(ConnectionStatus::Error);
        Ok(self.policy.delay_for(self.consecutive_failures))
    }

    /// Connecting|Connected → Error without advancing the backoff.
    pub fn on_rate_limited(&mut self) -> Result<(), TransitionError> {
        self.guard(
            "record rate limit",
            &[ConnectionStatus::Connecting, ConnectionStatus::Connected],
        )?;
        self.set(ConnectionStatus::Error);
        Ok(())
    }

    /// Error → Connecting.
    pub fn retry(&mut self) -> Result<(), TransitionError> {
        self.guard("retry", &[ConnectionStatus::Error])?;
        self.set(ConnectionStatus::Connecting);
        Ok(())
    }

    /// Forces Disconnected. Every later transition fails with `Stopped`.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.set(ConnectionStatus::Disconnected);
    }

    fn guard(&self, event: &'static str, allowed: &[ConnectionStatus]) -> Result<(), TransitionError> {
        if self.stopped {
            return Err(TransitionError::Stopped);
        }
        if !allowed.contains(&self.status) {
            return Err(TransitionError::Invalid {
                from: self.status,
                event,
            });
        }
        Ok(())
    }

    fn set(&mut self, to: ConnectionStatus) {
        if self.status != to {
            tracing::info!(
                from = %self.status,
                to = %to,
                failures = self.consecutive_failures,
                "Connection status changed"
            );
            self.status = to;
        }
    }
}
