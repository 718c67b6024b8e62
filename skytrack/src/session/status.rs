//! Connection status exposed to consumers.

use std::fmt;

use serde::Serialize;

/// Connection status of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Not tracking: before start or after stop.
    Disconnected,
    /// A resolution is under way and none has succeeded yet.
    Connecting,
    /// The last resolution produced a sample.
    Connected,
    /// The last resolution failed or was rate limited; a retry is scheduled.
    Error,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        }
    }

    /// User-facing label for status indicators.
    pub fn display_status(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "Offline",
            ConnectionStatus::Connecting => "Connecting...",
            ConnectionStatus::Connected => "Live",
            ConnectionStatus::Error => "Retrying",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
