//! OpenSky Network state vector provider.
//!
//! # URL Pattern
//!
//! - `{base}/states/all?icao24={hex}` for transponder address lookups
//! - `{base}/states/all` for callsign lookups, filtered client side
//!
//! Anonymous access works with tight quotas. When an API key is configured it
//! is sent as a bearer token.
//!
//! # Payload
//!
//! `{"time": 1700000000, "states": [[...], ...]}` where each state vector is a
//! positional array. Units are SI: metres and metres per second.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Deserialize;
use serde_json::Value;

use crate::provider::{
    AsyncHttpClient, FlightQuery, HttpRequest, ProviderDescriptor, ProviderError,
    TelemetryProvider,
};
use crate::telemetry::TelemetrySample;

const FEET_PER_METRE: f64 = 3.28084;
const KNOTS_PER_MPS: f64 = 1.943844;

// State vector indices
const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_TIME_POSITION: usize = 3;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;
const IDX_GEO_ALTITUDE: usize = 13;

#[derive(Debug, Deserialize)]
struct OpenSkyResponse {
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    states: Option<Vec<Vec<Value>>>,
}

fn number_at(state: &[Value], idx: usize) -> Option<f64> {
    state.get(idx).and_then(Value::as_f64)
}

fn text_at(state: &[Value], idx: usize) -> Option<&str> {
    state.get(idx).and_then(Value::as_str)
}

/// Provider for the OpenSky Network REST API.
pub struct OpenSkyProvider<C: AsyncHttpClient> {
    descriptor: ProviderDescriptor,
    http_client: C,
}

impl<C: AsyncHttpClient> OpenSkyProvider<C> {
    pub fn new(descriptor: ProviderDescriptor, http_client: C) -> Self {
        Self {
            descriptor,
            http_client,
        }
    }

    fn build_request(&self, query: &FlightQuery) -> HttpRequest {
        let url = match query {
            FlightQuery::Icao24(hex) => {
                format!("{}/states/all?icao24={}", self.descriptor.base_url, hex)
            }
            FlightQuery::Callsign(_) => format!("{}/states/all", self.descriptor.base_url),
        };

        let mut request = HttpRequest::get(url).timeout(self.descriptor.timeout);
        if let Some(key) = &self.descriptor.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }
        request
    }

    fn matches(state: &[Value], query: &FlightQuery) -> bool {
        match query {
            FlightQuery::Icao24(hex) => text_at(state, IDX_ICAO24)
                .map(|s| s.eq_ignore_ascii_case(hex))
                .unwrap_or(false),
            FlightQuery::Callsign(callsign) => text_at(state, IDX_CALLSIGN)
                .map(|s| s.trim().eq_ignore_ascii_case(callsign))
                .unwrap_or(false),
        }
    }

    fn parse(
        &self,
        body: &[u8],
        query: &FlightQuery,
        identifier: &str,
        received_at: DateTime<Utc>,
    ) -> Result<TelemetrySample, ProviderError> {
        let name = self.descriptor.name.as_str();
        let response: OpenSkyResponse = serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(provider = name, error = %e, "Malformed OpenSky payload");
            ProviderError::not_found(name, identifier)
        })?;

        let states = response.states.unwrap_or_default();
        let state = states
            .iter()
            .filter(|s| Self::matches(s, query))
            .find(|s| {
                number_at(s, IDX_LATITUDE).is_some() && number_at(s, IDX_LONGITUDE).is_some()
            })
            .ok_or_else(|| ProviderError::not_found(name, identifier))?;

        let (Some(lat), Some(lon)) = (number_at(state, IDX_LATITUDE), number_at(state, IDX_LONGITUDE))
        else {
            return Err(ProviderError::not_found(name, identifier));
        };

        let altitude_m = number_at(state, IDX_BARO_ALTITUDE)
            .or_else(|| number_at(state, IDX_GEO_ALTITUDE))
            .unwrap_or(0.0);
        let velocity_mps = number_at(state, IDX_VELOCITY).unwrap_or(0.0);
        let track = number_at(state, IDX_TRUE_TRACK).unwrap_or(0.0);

        let captured_at = state
            .get(IDX_TIME_POSITION)
            .and_then(Value::as_i64)
            .or(response.time)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or(received_at);

        TelemetrySample::live(
            name,
            lat,
            lon,
            altitude_m * FEET_PER_METRE,
            velocity_mps * KNOTS_PER_MPS,
            track,
            captured_at,
        )
        .map_err(|_| ProviderError::not_found(name, identifier))
    }
}

impl<C: AsyncHttpClient> TelemetryProvider for OpenSkyProvider<C> {
    fn fetch<'a>(
        &'a self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<TelemetrySample, ProviderError>> {
        Box::pin(async move {
            let query = FlightQuery::parse(identifier);
            if query.is_empty() {
                return Err(ProviderError::not_found(&self.descriptor.name, identifier));
            }

            let request = self.build_request(&query);
            let body = self
                .http_client
                .get(&request)
                .await
                .map_err(|e| ProviderError::unavailable(&self.descriptor.name, e))?;

            self.parse(&body, &query, identifier, Utc::now())
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

    const STATES: &str = r#"{
        "time": 1700000100,
        "states": [
            ["3c6444","DLH400  ","Germany",1700000090,1700000095,8.5,50.0,10000.0,false,230.0,270.0,0.0,null,10100.0,"1000",false,0],
            ["4ca7b3","BAW123  ","United Kingdom",1700000098,1700000099,-0.45,51.47,3000.0,false,100.0,90.0,0.0,null,3050.0,"2000",false,0]
        ]
    }"#;

    fn descriptor() -> ProviderDescriptor {
        ProviderDescriptor::new(
            "opensky",
            ProviderKind::OpenSky,
            "https://opensky-network.org/api",
        )
    }

    #[test]
    fn test_request_for_hex_query() {
        let p = OpenSkyProvider::new(descriptor(), MockAsyncHttpClient::ok("{}"));
        let request = p.build_request(&FlightQuery::Icao24("4ca7b3".to_string()));
        assert_eq!(
            request.url,
            "https://opensky-network.org/api/states/all?icao24=4ca7b3"
        );
        assert!(request.headers.is_empty());
    }

    #[test]
    fn test_request_carries_bearer_token() {
        let p = OpenSkyProvider::new(
            descriptor().with_api_key("secret"),
            MockAsyncHttpClient::ok("{}"),
        );
        let request = p.build_request(&FlightQuery::Callsign("BAW123".to_string()));
        assert_eq!(request.url, "https://opensky-network.org/api/states/all");
        assert_eq!(
            request.headers,
            vec![("Authorization".to_string(), "Bearer secret".to_string())]
        );
    }

    #[tokio::test]
    async fn test_fetch_by_callsign_converts_units() {
        let p = OpenSkyProvider::new(descriptor(), MockAsyncHttpClient::ok(STATES));
        let sample = p.fetch("baw123").await.unwrap();

        assert_eq!(sample.latitude(), 51.47);
        assert_eq!(sample.longitude(), -0.45);
        assert!((sample.altitude_ft() - 9842.52).abs() < 0.01);
        assert!((sample.ground_speed_kt() - 194.3844).abs() < 1e-6);
        assert_eq!(sample.heading_deg(), 90.0);
        assert_eq!(
            sample.captured_at(),
            DateTime::from_timestamp(1_700_000_098, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_fetch_by_hex() {
        let p = OpenSkyProvider::new(descriptor(), MockAsyncHttpClient::ok(STATES));
        let sample = p.fetch("icao24:3c6444").await.unwrap();
        assert_eq!(sample.latitude(), 50.0);
    }

    #[tokio::test]
    async fn test_geo_altitude_fallback() {
        let body = r#"{"time":1,"states":[["abcdef","X1",null,null,1,1.0,2.0,null,false,null,null,null,null,500.0]]}"#;
        let p = OpenSkyProvider::new(descriptor(), MockAsyncHttpClient::ok(body));
        let sample = p.fetch("X1").await.unwrap();
        assert!((sample.altitude_ft() - 1640.42).abs() < 0.01);
        assert_eq!(sample.ground_speed_kt(), 0.0);
    }

    #[tokio::test]
    async fn test_unknown_callsign_is_not_found() {
        let p = OpenSkyProvider::new(descriptor(), MockAsyncHttpClient::ok(STATES));
        let result = p.fetch("AFR1").await;
        assert!(matches!(result, Err(ProviderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_null_states_is_not_found() {
        let p = OpenSkyProvider::new(
            descriptor(),
            MockAsyncHttpClient::ok(r#"{"time":1,"states":null}"#),
        );
        assert!(matches!(
            p.fetch("BAW123").await,
            Err(ProviderError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_state_without_position_is_not_found() {
        let body = r#"{"time":1,"states":[["abcdef","BAW123",null,null,1,null,null]]}"#;
        let p = OpenSkyProvider::new(descriptor(), MockAsyncHttpClient::ok(body));
        assert!(matches!(
            p.fetch("BAW123").await,
            Err(ProviderError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_rate_limited_status_is_unavailable() {
        let mock = MockAsyncHttpClient::err(HttpError::Status {
            status: 429,
            url: "u".to_string(),
        });
        let p = OpenSkyProvider::new(descriptor(), mock);
        assert!(matches!(
            p.fetch("BAW123").await,
            Err(ProviderError::Unavailable { .. })
        ));
    }
}
