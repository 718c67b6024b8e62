//! Consumer-facing side of a tracking session.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::telemetry::{PositionHistory, TelemetrySample};

use super::ConnectionStatus;

/// Capacity of the position update broadcast. Slow subscribers skip ahead.
const UPDATE_CHANNEL_CAPACITY: usize = 64;

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingSession {
    pub session_id: String,
    pub flight_identifier: String,
    pub last_anchor: Option<TelemetrySample>,
    pub is_active: bool,
    pub reconnect_attempts: u32,
    pub connection_status: ConnectionStatus,
    /// Set while the session waits out a rate limit.
    pub retry_after: Option<Duration>,
    pub last_error: Option<String>,
}

/// State shared between the session task and its handle.
pub(crate) struct SessionOutputs {
    pub(crate) position: watch::Sender<Option<TelemetrySample>>,
    pub(crate) status: watch::Sender<ConnectionStatus>,
    pub(crate) updates: broadcast::Sender<TelemetrySample>,
    pub(crate) history: Mutex<PositionHistory>,
    pub(crate) info: Mutex<TrackingSession>,
}

impl SessionOutputs {
    pub(crate) fn new(session_id: &str, flight: &str, history_capacity: usize) -> Self {
        let (position, _) = watch::channel(None);
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);

        Self {
            position,
            status,
            updates,
            history: Mutex::new(PositionHistory::with_capacity(history_capacity)),
            info: Mutex::new(TrackingSession {
                session_id: session_id.to_string(),
                flight_identifier: flight.to_string(),
                last_anchor: None,
                is_active: true,
                reconnect_attempts: 0,
                connection_status: ConnectionStatus::Disconnected,
                retry_after: None,
                last_error: None,
            }),
        }
    }

    /// Publishes a real or derived sample to every output.
    pub(crate) fn emit(&self, sample: TelemetrySample) {
        self.history.lock().push(sample.clone());
        self.position.send_replace(Some(sample.clone()));
        // No subscribers is fine
        let _ = self.updates.send(sample);
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        self.info.lock().connection_status = status;
        self.status.send_if_modified(|current| {
            if *current != status {
                *current = status;
                true
            } else {
                false
            }
        });
    }
}

/// Stream of position updates with an explicit unsubscribe.
pub struct PositionSubscription {
    rx: broadcast::Receiver<TelemetrySample>,
}

impl PositionSubscription {
    /// Waits for the next update. Returns `None` once the session is gone.
    ///
    /// Updates missed by a slow subscriber are skipped.
    pub async fn recv(&mut self) -> Option<TelemetrySample> {
        loop {
            match self.rx.recv().await {
                Ok(sample) => return Some(sample),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Position subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns an update if one is already queued.
    pub fn try_recv(&mut self) -> Option<TelemetrySample> {
        loop {
            match self.rx.try_recv() {
                Ok(sample) => return Some(sample),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }

    /// Stops receiving updates.
    pub fn unsubscribe(self) {}
}

/// Handle to a running tracking session.
///
/// Dropping the handle cancels the session; call [`stop`](Self::stop) to
/// also wait for it to wind down.
pub struct SessionHandle {
    session_id: String,
    flight: String,
    cancel: CancellationToken,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    outputs: Arc<SessionOutputs>,
}

impl SessionHandle {
    pub(crate) fn new(
        session_id: String,
        flight: String,
        cancel: CancellationToken,
        task: JoinHandle<()>,
        outputs: Arc<SessionOutputs>,
    ) -> Self {
        Self {
            session_id,
            flight,
            cancel,
            task: tokio::sync::Mutex::new(Some(task)),
            outputs,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn flight_identifier(&self) -> &str {
        &self.flight
    }

    /// Latest emitted position, real or derived.
    pub fn current_position(&self) -> Option<TelemetrySample> {
        self.outputs.position.borrow().clone()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.outputs.status.borrow()
    }

    /// Receiver that observes every change of the current position.
    pub fn watch_position(&self) -> watch::Receiver<Option<TelemetrySample>> {
        self.outputs.position.subscribe()
    }

    /// Receiver that observes connection status transitions.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.outputs.status.subscribe()
    }

    /// Subscribes to pushed position updates.
    pub fn subscribe(&self) -> PositionSubscription {
        PositionSubscription {
            rx: self.outputs.updates.subscribe(),
        }
    }

    /// Recent samples, oldest first.
    pub fn history(&self) -> Vec<TelemetrySample> {
        self.outputs.history.lock().to_vec()
    }

    pub fn snapshot(&self) -> TrackingSession {
        self.outputs.info.lock().clone()
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    /// Stops the session and waits for its task to finish.
    ///
    /// Cancels the poll timer, the animation timer and any in-flight
    /// resolution. Idempotent. Once this returns no further updates are
    /// emitted.
    pub async fn stop(&self) {
        self.cancel.cancel();

        let mut task = self.task.lock().await;
        if let Some(handle) = task.take() {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(session = %self.session_id, "Tracking task panicked");
                }
            }
            tracing::info!(session = %self.session_id, flight = %self.flight, "Tracking stopped");
        }

        {
            let mut info = self.outputs.info.lock();
            info.is_active = false;
        }
        self.outputs.set_status(ConnectionStatus::Disconnected);
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
