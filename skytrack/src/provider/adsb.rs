//! ADS-B Exchange v2 compatible feeds.
//!
//! Several community aggregators expose the same readsb-derived JSON schema:
//! adsb.lol, adsb.fi and airplanes.live among them. One adapter serves all of
//! them; only the base URL differs.
//!
//! # URL Pattern
//!
//! - `{base}/v2/callsign/{CALLSIGN}`
//! - `{base}/v2/hex/{icao24}`
//!
//! # Payload
//!
//! ```text
//! { "ac": [ { "flight": "BAW123  ", "lat": 51.47, "lon": -0.45,
//!             "alt_baro": 35000 | "ground", "gs": 450.2, "track": 89.7,
//!             "seen_pos": 1.3 } ],
//!   "now": 1700000000000 }
//! ```
//!
//! `alt_baro` is feet (or the literal `"ground"`), `gs` knots, `track`
//! degrees true, `seen_pos` seconds since the position was received and
//! `now` milliseconds since the epoch.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::provider::{
    AsyncHttpClient, FlightQuery, HttpRequest, ProviderDescriptor, ProviderError,
    TelemetryProvider,
};
use crate::telemetry::TelemetrySample;

#[derive(Debug, Deserialize)]
struct AdsbResponse {
    #[serde(default)]
    ac: Option<Vec<AdsbAircraft>>,
    #[serde(default)]
    now: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AdsbAircraft {
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    alt_baro: Option<serde_json::Value>,
    #[serde(default)]
    alt_geom: Option<f64>,
    #[serde(default)]
    gs: Option<f64>,
    #[serde(default)]
    track: Option<f64>,
    #[serde(default)]
    true_heading: Option<f64>,
    #[serde(default)]
    seen_pos: Option<f64>,
}

impl AdsbAircraft {
    fn altitude_ft(&self) -> f64 {
        match &self.alt_baro {
            Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            // "ground" and anything else non-numeric
            Some(_) => 0.0,
            None => self.alt_geom.unwrap_or(0.0),
        }
    }
}

/// Provider for ADS-B Exchange v2 compatible aggregators.
pub struct AdsbExchangeProvider<C: AsyncHttpClient> {
    descriptor: ProviderDescriptor,
    http_client: C,
}

impl<C: AsyncHttpClient> AdsbExchangeProvider<C> {
    pub fn new(descriptor: ProviderDescriptor, http_client: C) -> Self {
        Self {
            descriptor,
            http_client,
        }
    }

    fn build_url(&self, query: &FlightQuery) -> String {
        match query {
            FlightQuery::Callsign(callsign) => {
                format!("{}/v2/callsign/{}", self.descriptor.base_url, callsign)
            }
            FlightQuery::Icao24(hex) => format!("{}/v2/hex/{}", self.descriptor.base_url, hex),
        }
    }

    /// Maps a response body onto a sample. The first aircraft with a position wins.
    fn parse(
        &self,
        body: &[u8],
        identifier: &str,
        received_at: DateTime<Utc>,
    ) -> Result<TelemetrySample, ProviderError> {
        let name = self.descriptor.name.as_str();
        let response: AdsbResponse = serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(provider = name, error = %e, "Malformed ADS-B payload");
            ProviderError::not_found(name, identifier)
        })?;

        let base_time = response
            .now
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            .unwrap_or(received_at);

        let aircraft = response
            .ac
            .unwrap_or_default()
            .into_iter()
            .find(|a| a.lat.is_some() && a.lon.is_some())
            .ok_or_else(|| ProviderError::not_found(name, identifier))?;

        let (Some(lat), Some(lon)) = (aircraft.lat, aircraft.lon) else {
            return Err(ProviderError::not_found(name, identifier));
        };

        // An age that does not fit the calendar falls back to the feed time.
        let seen_ms = (aircraft.seen_pos.unwrap_or(0.0).max(0.0) * 1000.0) as i64;
        let captured_at = chrono::Duration::try_milliseconds(seen_ms)
            .and_then(|age| base_time.checked_sub_signed(age))
            .unwrap_or(base_time);

        TelemetrySample::live(
            name,
            lat,
            lon,
            aircraft.altitude_ft(),
            aircraft.gs.unwrap_or(0.0),
            aircraft.track.or(aircraft.true_heading).unwrap_or(0.0),
            captured_at,
        )
        .map_err(|e| {
            tracing::debug!(provider = name, error = %e, "Discarding out-of-range position");
            ProviderError::not_found(name, identifier)
        })
    }
}

impl<C: AsyncHttpClient> TelemetryProvider for AdsbExchangeProvider<C> {
    fn fetch<'a>(
        &'a self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<TelemetrySample, ProviderError>> {
        Box::pin(async move {
            let query = FlightQuery::parse(identifier);
            if query.is_empty() {
                return Err(ProviderError::not_found(&self.descriptor.name, identifier));
            }

            let request = HttpRequest::get(self.build_url(&query)).timeout(self.descriptor.timeout);
            let body = self
                .http_client
                .get(&request)
                .await
                .map_err(|e| ProviderError::unavailable(&self.descriptor.name, e))?;

            self.parse(&body, identifier, Utc::now())
        })
    }

    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{HttpError, MockAsyncHttpClient, ProviderKind};
    use std::time::Duration;

    const LIVE_PAYLOAD: &str = r#"{
        "ac": [{"hex":"4ca7b3","flight":"BAW123  ","lat":51.47,"lon":-0.45,
                "alt_baro":35000,"gs":450.0,"track":90.0,"seen_pos":2.0}],
        "now": 1700000010000, "total": 1
    }"#;

    fn descriptor() -> ProviderDescriptor {
        ProviderDescriptor::new("adsb_lol", ProviderKind::AdsbExchange, "https://api.adsb.lol")
            .with_timeout(Duration::from_secs(3))
    }

    fn provider(mock: MockAsyncHttpClient) -> AdsbExchangeProvider<MockAsyncHttpClient> {
        AdsbExchangeProvider::new(descriptor(), mock)
    }

    #[test]
    fn test_url_construction_callsign() {
        let p = provider(MockAsyncHttpClient::ok("{}"));
        assert_eq!(
            p.build_url(&FlightQuery::parse("baw123")),
            "https://api.adsb.lol/v2/callsign/BAW123"
        );
    }

    #[test]
    fn test_url_construction_hex() {
        let p = provider(MockAsyncHttpClient::ok("{}"));
        assert_eq!(
            p.build_url(&FlightQuery::parse("icao24:4CA7B3")),
            "https://api.adsb.lol/v2/hex/4ca7b3"
        );
    }

    #[tokio::test]
    async fn test_fetch_maps_fields() {
        let mock = MockAsyncHttpClient::ok(LIVE_PAYLOAD);
        let p = provider(mock.clone());

        let sample = p.fetch("BAW123").await.unwrap();
        assert_eq!(sample.latitude(), 51.47);
        assert_eq!(sample.longitude(), -0.45);
        assert_eq!(sample.altitude_ft(), 35000.0);
        assert_eq!(sample.ground_speed_kt(), 450.0);
        assert_eq!(sample.heading_deg(), 90.0);
        assert_eq!(
            sample.captured_at(),
            DateTime::from_timestamp_millis(1_700_000_008_000).unwrap()
        );

        let request = mock.last_request().unwrap();
        assert_eq!(request.timeout, Some(Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_ground_altitude_is_zero() {
        let body = r#"{"ac":[{"lat":51.47,"lon":-0.45,"alt_baro":"ground","gs":5.0}],"now":1700000000000}"#;
        let sample = provider(MockAsyncHttpClient::ok(body)).fetch("BAW1").await.unwrap();
        assert_eq!(sample.altitude_ft(), 0.0);
        assert_eq!(sample.heading_deg(), 0.0);
    }

    #[tokio::test]
    async fn test_missing_numeric_fields_default_to_zero() {
        let body = r#"{"ac":[{"lat":10.0,"lon":20.0}],"now":1700000000000}"#;
        let sample = provider(MockAsyncHttpClient::ok(body)).fetch("X").await.unwrap();
        assert_eq!(sample.altitude_ft(), 0.0);
        assert_eq!(sample.ground_speed_kt(), 0.0);
        assert_eq!(sample.heading_deg(), 0.0);
    }

    #[tokio::test]
    async fn test_skips_aircraft_without_position() {
        let body = r#"{"ac":[{"gs":100.0},{"lat":1.0,"lon":2.0,"gs":300.0}],"now":1700000000000}"#;
        let sample = provider(MockAsyncHttpClient::ok(body)).fetch("X").await.unwrap();
        assert_eq!(sample.ground_speed_kt(), 300.0);
    }

    #[tokio::test]
    async fn test_huge_seen_pos_uses_feed_time() {
        let body = r#"{"ac":[{"lat":51.47,"lon":-0.45,"gs":450.0,"seen_pos":1e13}],"now":1700000000000}"#;
        let sample = provider(MockAsyncHttpClient::ok(body)).fetch("BAW123").await.unwrap();
        assert_eq!(
            sample.captured_at(),
            DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
        );
        assert_eq!(sample.ground_speed_kt(), 450.0);
    }

    #[tokio::test]
    async fn test_empty_list_is_not_found() {
        let result = provider(MockAsyncHttpClient::ok(r#"{"ac":[],"now":1}"#))
            .fetch("BAW123")
            .await;
        assert!(matches!(result, Err(ProviderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_null_list_is_not_found() {
        let result = provider(MockAsyncHttpClient::ok(r#"{"ac":null}"#)).fetch("BAW123").await;
        assert!(matches!(result, Err(ProviderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_malformed_body_is_not_found() {
        let result = provider(MockAsyncHttpClient::ok("<html>")).fetch("BAW123").await;
        assert!(matches!(result, Err(ProviderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_out_of_range_position_is_not_found() {
        let body = r#"{"ac":[{"lat":95.0,"lon":0.0}]}"#;
        let result = provider(MockAsyncHttpClient::ok(body)).fetch("X").await;
        assert!(matches!(result, Err(ProviderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let mock = MockAsyncHttpClient::err(HttpError::Status {
            status: 502,
            url: "u".to_string(),
        });
        let result = provider(mock).fetch("BAW123").await;
        match result {
            Err(ProviderError::Unavailable { provider, cause }) => {
                assert_eq!(provider, "adsb_lol");
                assert!(cause.contains("502"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_identifier_skips_request() {
        let mock = MockAsyncHttpClient::ok(LIVE_PAYLOAD);
        let result = provider(mock.clone()).fetch("  ").await;
        assert!(matches!(result, Err(ProviderError::NotFound { .. })));
        assert_eq!(mock.request_count(), 0);
    }
}
