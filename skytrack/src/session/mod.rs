//! Tracking sessions.
//!
//! A session follows one flight: it polls the orchestrator, feeds real
//! samples to the extrapolator as anchors, emits derived positions on a fixed
//! animation tick, and schedules retries through the reconnect machine.
//!
//! # Outputs
//!
//! | Output | Access |
//! |--------|--------|
//! | Current position (real or derived) | [`SessionHandle::current_position`], [`SessionHandle::watch_position`] |
//! | Connection status | [`SessionHandle::connection_status`], [`SessionHandle::watch_status`] |
//! | Pushed updates | [`SessionHandle::subscribe`] |
//! | Trail (bounded history) | [`SessionHandle::history`] |
//! | Rate-limit countdown | [`TrackingSession::retry_after`] via [`SessionHandle::snapshot`] |
//!
//! # Scheduling
//!
//! - First resolution immediately
//! - After success: `poll_interval`
//! - After `AllProvidersExhausted`: backoff delay from the reconnect machine
//! - After `RateLimited`: `max(retry_after, poll_interval)`, backoff untouched

mod config;
mod handle;
mod reconnect;
mod status;
mod tracker;

pub use config::{SessionConfig, DEFAULT_ANIMATION_TICK, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
pub use handle::{PositionSubscription, SessionHandle, TrackingSession};
pub use reconnect::{BackoffPolicy, ReconnectMachine, TransitionError};
pub use status::ConnectionStatus;

pub(crate) use tracker::spawn_session;
