//! Core types for telemetry providers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::telemetry::TelemetrySample;

/// Default per-request timeout for a provider.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);

/// Errors produced by a single provider lookup.
///
/// `Clone` so one resolution outcome can be shared with every caller
/// coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider answered but has no usable data for this flight.
    #[error("{provider} has no data for {identifier}")]
    NotFound {
        provider: String,
        identifier: String,
    },

    /// Network failure, non-2xx status or timeout.
    #[error("{provider} unavailable: {cause}")]
    Unavailable { provider: String, cause: String },

    /// The provider could not be constructed from its descriptor.
    #[error("invalid provider configuration: {0}")]
    Configuration(String),
}

impl ProviderError {
    pub fn not_found(provider: &str, identifier: &str) -> Self {
        Self::NotFound {
            provider: provider.to_string(),
            identifier: identifier.to_string(),
        }
    }

    pub fn unavailable(provider: &str, cause: impl fmt::Display) -> Self {
        Self::Unavailable {
            provider: provider.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Payload family a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// ADS-B Exchange v2 compatible feeds (adsb.lol, adsb.fi, airplanes.live).
    AdsbExchange,
    /// The OpenSky Network state vector API.
    OpenSky,
    /// The AviationStack flights API.
    AviationStack,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::AdsbExchange => "adsb",
            ProviderKind::OpenSky => "opensky",
            ProviderKind::AviationStack => "aviationstack",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "adsb" | "adsbexchange" => Ok(ProviderKind::AdsbExchange),
            "opensky" => Ok(ProviderKind::OpenSky),
            "aviationstack" => Ok(ProviderKind::AviationStack),
            other => Err(ProviderError::Configuration(format!(
                "unknown provider kind '{}'",
                other
            ))),
        }
    }
}

/// Static configuration of one provider. Loaded once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub name: String,
    pub kind: ProviderKind,
    pub base_url: String,
    pub timeout: Duration,
    /// Lower value wins when ranking cannot otherwise separate two providers.
    pub priority: u32,
    pub api_key: Option<String>,
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, kind: ProviderKind, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            priority: 0,
            api_key: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// What a caller asked to track.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlightQuery {
    /// ATC callsign or flight number, e.g. `BAW123`.
    Callsign(String),
    /// 24-bit ICAO transponder address in lowercase hex, e.g. `4ca7b3`.
    Icao24(String),
}

impl FlightQuery {
    /// Parses a flight identifier.
    ///
    /// `icao24:<hex>` (prefix case-insensitive) selects a transponder address
    /// lookup; anything else is a callsign, uppercased with whitespace removed.
    pub fn parse(identifier: &str) -> Self {
        let trimmed = identifier.trim();
        let lower = trimmed.to_ascii_lowercase();
        if let Some(hex) = lower.strip_prefix("icao24:") {
            let hex = hex.trim();
            if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return FlightQuery::Icao24(hex.to_string());
            }
        }
        FlightQuery::Callsign(
            trimmed
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_uppercase(),
        )
    }

    /// True when there is nothing to look up.
    pub fn is_empty(&self) -> bool {
        match self {
            FlightQuery::Callsign(s) | FlightQuery::Icao24(s) => s.is_empty(),
        }
    }
}

/// A source of live telemetry.
///
/// Dyn-compatible so the orchestrator can hold a heterogeneous provider list
/// as `Arc<dyn TelemetryProvider>`.
pub trait TelemetryProvider: Send + Sync {
    /// Looks up the current state of a flight.
    ///
    /// Returns `NotFound` when the provider has no usable record, and
    /// `Unavailable` for network failures, non-2xx statuses and timeouts.
    fn fetch<'a>(&'a self, identifier: &'a str)
        -> BoxFuture<'a, Result<TelemetrySample, ProviderError>>;

    /// Static configuration of this provider.
    fn descriptor(&self) -> &ProviderDescriptor;

    fn name(&self) -> &str {
        &self.descriptor().name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_str() {
        assert_eq!("adsb".parse::<ProviderKind>().unwrap(), ProviderKind::AdsbExchange);
        assert_eq!("OpenSky".parse::<ProviderKind>().unwrap(), ProviderKind::OpenSky);
        assert_eq!(
            " aviationstack ".parse::<ProviderKind>().unwrap(),
            ProviderKind::AviationStack
        );
        assert!("flightradar".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_kind_display_roundtrips() {
        for kind in [
            ProviderKind::AdsbExchange,
            ProviderKind::OpenSky,
            ProviderKind::AviationStack,
        ] {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_descriptor_builder() {
        let d = ProviderDescriptor::new("adsb_lol", ProviderKind::AdsbExchange, "https://api.adsb.lol/")
            .with_timeout(Duration::from_millis(1500))
            .with_priority(2)
            .with_api_key("k");
        assert_eq!(d.base_url, "https://api.adsb.lol");
        assert_eq!(d.timeout, Duration::from_millis(1500));
        assert_eq!(d.priority, 2);
        assert_eq!(d.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_query_parse_callsign() {
        assert_eq!(
            FlightQuery::parse("  baw 123 "),
            FlightQuery::Callsign("BAW123".to_string())
        );
    }

    #[test]
    fn test_query_parse_icao24() {
        assert_eq!(
            FlightQuery::parse("ICAO24:4CA7B3"),
            FlightQuery::Icao24("4ca7b3".to_string())
        );
    }

    #[test]
    fn test_query_parse_bad_hex_falls_back_to_callsign() {
        assert_eq!(
            FlightQuery::parse("icao24:xyz"),
            FlightQuery::Callsign("ICAO24:XYZ".to_string())
        );
    }

    #[test]
    fn test_query_empty() {
        assert!(FlightQuery::parse("   ").is_empty());
        assert!(!FlightQuery::parse("BAW1").is_empty());
    }

    #[test]
    fn test_error_display() {
        let e = ProviderError::unavailable("opensky", "HTTP 503");
        assert_eq!(e.to_string(), "opensky unavailable: HTTP 503");
        let e = ProviderError::not_found("opensky", "BAW1");
        assert_eq!(e.to_string(), "opensky has no data for BAW1");
    }
}
