//! The tracking task: polling, extrapolation and reconnect scheduling.
//!
//! One task per session multiplexes four event sources with `select!`:
//!
//! - cancellation (highest priority)
//! - completion of the in-flight resolution
//! - the poll deadline, armed only while nothing is in flight
//! - the animation tick, which keeps running during resolutions
//!
//! The task owns its reconnect machine and extrapolator outright, so there
//! is never more than one timer of each kind per session.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::extrapolation::Extrapolator;
use crate::orchestrator::{FallbackOrchestrator, ResolveError};
use crate::telemetry::TelemetrySample;

use super::handle::SessionOutputs;
use super::{ConnectionStatus, ReconnectMachine, SessionConfig, SessionHandle, MIN_POLL_INTERVAL};

type Resolution = BoxFuture<'static, Result<TelemetrySample, ResolveError>>;

/// Starts tracking `flight` on the current tokio runtime.
pub(crate) fn spawn_session(
    session_id: String,
    flight: String,
    mut config: SessionConfig,
    orchestrator: Arc<FallbackOrchestrator>,
) -> SessionHandle {
    config.poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);

    let outputs = Arc::new(SessionOutputs::new(
        &session_id,
        &flight,
        config.history_capacity,
    ));
    let cancel = CancellationToken::new();

    let task = SessionTask {
        caller: config
            .caller_key
            .clone()
            .unwrap_or_else(|| session_id.clone()),
        session_id: session_id.clone(),
        flight: flight.clone(),
        machine: ReconnectMachine::new(config.backoff),
        extrapolator: Extrapolator::new(config.extrapolation()),
        config,
        orchestrator,
        outputs: Arc::clone(&outputs),
        cancel: cancel.clone(),
    };

    tracing::info!(session = %session_id, flight = %flight, "Tracking started");
    let join = tokio::spawn(task.run());

    SessionHandle::new(session_id, flight, cancel, join, outputs)
}

struct SessionTask {
    session_id: String,
    flight: String,
    caller: String,
    config: SessionConfig,
    orchestrator: Arc<FallbackOrchestrator>,
    machine: ReconnectMachine,
    extrapolator: Extrapolator,
    outputs: Arc<SessionOutputs>,
    cancel: CancellationToken,
}

impl SessionTask {
    async fn run(mut self) {
        if let Err(e) = self.machine.start() {
            tracing::warn!(session = %self.session_id, error = %e, "Session could not start");
            return;
        }
        self.publish_status();

        let mut next_poll = Instant::now();
        let mut in_flight: Option<Resolution> = None;

        let mut ticker = tokio::time::interval(self.config.animation_tick.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                result = async {
                    match in_flight.as_mut() {
                        Some(resolution) => resolution.await,
                        None => futures::future::pending().await,
                    }
                }, if in_flight.is_some() => {
                    in_flight = None;
                    next_poll = self.handle_result(result);
                }

                _ = tokio::time::sleep_until(next_poll), if in_flight.is_none() => {
                    in_flight = Some(self.begin_resolution());
                }

                _ = ticker.tick() => {
                    if let Some(derived) = self.extrapolator.tick(Instant::now()) {
                        self.outputs.emit(derived);
                    }
                }
            }
        }

        // Dropping the in-flight future aborts the resolution.
        drop(in_flight);
        self.machine.stop();
        self.publish_status();
        tracing::debug!(session = %self.session_id, "Tracking task exited");
    }

    fn begin_resolution(&mut self) -> Resolution {
        if self.machine.status() == ConnectionStatus::Error {
            if let Err(e) = self.machine.retry() {
                tracing::warn!(session = %self.session_id, error = %e, "Retry rejected");
            }
            self.publish_status();
        }

        tracing::debug!(session = %self.session_id, flight = %self.flight, "Resolving position");
        let orchestrator = Arc::clone(&self.orchestrator);
        let caller = self.caller.clone();
        let flight = self.flight.clone();
        Box::pin(async move { orchestrator.resolve_as(&caller, &flight).await })
    }

    /// Applies a resolution outcome and returns when to poll next.
    fn handle_result(&mut self, result: Result<TelemetrySample, ResolveError>) -> Instant {
        let now = Instant::now();

        let next = match result {
            Ok(sample) => {
                if let Err(e) = self.machine.on_success() {
                    tracing::warn!(session = %self.session_id, error = %e, "Unexpected success transition");
                }
                self.extrapolator.set_anchor(sample.clone(), now);
                {
                    let mut info = self.outputs.info.lock();
                    info.last_anchor = Some(sample.clone());
                    info.retry_after = None;
                    info.last_error = None;
                    info.reconnect_attempts = 0;
                }
                self.outputs.emit(sample);
                now + self.config.poll_interval
            }
            Err(ResolveError::RateLimited { retry_after }) => {
                if let Err(e) = self.machine.on_rate_limited() {
                    tracing::warn!(session = %self.session_id, error = %e, "Unexpected rate limit transition");
                }
                let wait = retry_after.max(self.config.poll_interval);
                {
                    let mut info = self.outputs.info.lock();
                    info.retry_after = Some(retry_after);
                    info.last_error = Some(format!(
                        "rate limited, retry after {}ms",
                        retry_after.as_millis()
                    ));
                }
                tracing::info!(
                    session = %self.session_id,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Session rate limited"
                );
                now + wait
            }
            Err(e @ ResolveError::AllProvidersExhausted { .. }) => {
                let delay = match self.machine.on_failure() {
                    Ok(delay) => delay,
                    Err(err) => {
                        tracing::warn!(session = %self.session_id, error = %err, "Unexpected failure transition");
                        self.config.backoff.max
                    }
                };
                {
                    let mut info = self.outputs.info.lock();
                    info.reconnect_attempts = self.machine.consecutive_failures();
                    info.retry_after = None;
                    info.last_error = Some(e.to_string());
                }
                tracing::info!(
                    session = %self.session_id,
                    failures = self.machine.consecutive_failures(),
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling reconnect"
                );
                now + delay
            }
        };

        self.publish_status();
        next
    }

    fn publish_status(&self) {
        self.outputs.set_status(self.machine.status());
    }
}
