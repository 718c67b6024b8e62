//! AviationStack flights provider.
//!
//! Commercial API with a free tier; requires an access key.
//!
//! # URL Pattern
//!
//! - `{base}/v1/flights?access_key={key}&flight_icao={CALLSIGN}` for three-letter
//!   airline designators (`BAW123`)
//! - `{base}/v1/flights?access_key={key}&flight_iata={FLIGHT}` otherwise (`BA123`)
//!
//! Transponder address lookups are not supported and report `NotFound`
//! without issuing a request.
//!
//! # Payload
//!
//! Each record in `data` may carry a `live` block with `latitude`, `longitude`,
//! `altitude` (metres), `direction` (degrees), `speed_horizontal` (km/h) and
//! `updated` (RFC 3339). Errors arrive as a 200 with a top-level `error` object.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Deserialize;

use crate::provider::{
    AsyncHttpClient, FlightQuery, HttpRequest, ProviderDescriptor, ProviderError,
    TelemetryProvider,
};
use crate::telemetry::TelemetrySample;

const FEET_PER_METRE: f64 = 3.28084;
const KNOTS_PER_KMH: f64 = 0.539957;

#[derive(Debug, Deserialize)]
struct AviationStackResponse {
    #[serde(default)]
    data: Option<Vec<FlightRecord>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FlightRecord {
    #[serde(default)]
    live: Option<LiveBlock>,
}

#[derive(Debug, Deserialize)]
struct LiveBlock {
    #[serde(default)]
    updated: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    altitude: Option<f64>,
    #[serde(default)]
    direction: Option<f64>,
    #[serde(default)]
    speed_horizontal: Option<f64>,
}

/// Provider for the AviationStack REST API.
pub struct AviationStackProvider<C: AsyncHttpClient> {
    descriptor: ProviderDescriptor,
    api_key: String,
    http_client: C,
}

impl<C: AsyncHttpClient> AviationStackProvider<C> {
    /// Creates the provider. Fails when the descriptor carries no API key.
    pub fn new(descriptor: ProviderDescriptor, http_client: C) -> Result<Self, ProviderError> {
        let api_key = descriptor.api_key.clone().ok_or_else(|| {
            ProviderError::Configuration(format!(
                "provider '{}' requires an api_key",
                descriptor.name
            ))
        })?;

        Ok(Self {
            descriptor,
            api_key,
            http_client,
        })
    }

    fn build_url(&self, callsign: &str) -> String {
        let designator_len = callsign
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .count();
        let param = if designator_len == 3 {
            "flight_icao"
        } else {
            "flight_iata"
        };
        format!(
            "{}/v1/flights?access_key={}&{}={}",
            self.descriptor.base_url, self.api_key, param, callsign
        )
    }

    fn parse(
        &self,
        body: &[u8],
        identifier: &str,
        received_at: DateTime<Utc>,
    ) -> Result<TelemetrySample, ProviderError> {
        let name = self.descriptor.name.as_str();
        let response: AviationStackResponse = serde_json::from_slice(body).map_err(|e| {
            tracing::debug!(provider = name, error = %e, "Malformed AviationStack payload");
            ProviderError::not_found(name, identifier)
        })?;

        if let Some(error) = response.error {
            return Err(ProviderError::unavailable(
                name,
                format!(
                    "{}: {}",
                    error.code.as_deref().unwrap_or("api_error"),
                    error.message.as_deref().unwrap_or("no message")
                ),
            ));
        }

        let live = response
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|record| record.live)
            .find(|live| live.latitude.is_some() && live.longitude.is_some())
            .ok_or_else(|| ProviderError::not_found(name, identifier))?;

        let (Some(lat), Some(lon)) = (live.latitude, live.longitude) else {
            return Err(ProviderError::not_found(name, identifier));
        };

        let captured_at = live
            .updated
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(received_at);

        TelemetrySample::live(
            name,
            lat,
            lon,
            live.altitude.unwrap_or(0.0) * FEET_PER_METRE,
            live.speed_horizontal.unwrap_or(0.0) * KNOTS_PER_KMH,
            live.direction.unwrap_or(0.0),
            captured_at,
        )
        .map_err(|_| ProviderError::not_found(name, identifier))
    }
}

impl<C: AsyncHttpClient> TelemetryProvider for AviationStackProvider<C> {
    fn fetch<'a>(
        &'a self,
        identifier: &'a str,
    ) -> BoxFuture<'a, Result<TelemetrySample, ProviderError>> {
        Box::pin(async move {
            let callsign = match FlightQuery::parse(identifier) {
                FlightQuery::Callsign(c) if !c.is_empty() => c,
                _ => return Err(ProviderError::not_found(&self.descriptor.name, identifier)),
            };

            let request = HttpRequest::get(self.build_url(&callsign)).timeout(self.descriptor.timeout);
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
    use crate::provider::{MockAsyncHttpClient, ProviderKind};

    const LIVE: &str = r#"{
        "pagination": {"limit": 100, "offset": 0, "count": 2, "total": 2},
        "data": [
            {"flight": {"iata": "BA123"}, "live": null},
            {"flight": {"iata": "BA123"}, "live": {
                "updated": "2023-11-14T22:13:20+00:00",
                "latitude": 51.47, "longitude": -0.45, "altitude": 10000.0,
                "direction": 270.0, "speed_horizontal": 800.0, "is_ground": false
            }}
        ]
    }"#;

    fn descriptor() -> ProviderDescriptor {
        ProviderDescriptor::new(
            "aviationstack",
            ProviderKind::AviationStack,
            "http://api.aviationstack.com",
        )
        .with_api_key("KEY")
    }

    #[test]
    fn test_requires_api_key() {
        let d = ProviderDescriptor::new("a", ProviderKind::AviationStack, "http://x");
        let result = AviationStackProvider::new(d, MockAsyncHttpClient::ok("{}"));
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }

    #[test]
    fn test_url_picks_designator_kind() {
        let p = AviationStackProvider::new(descriptor(), MockAsyncHttpClient::ok("{}")).unwrap();
        assert_eq!(
            p.build_url("BAW123"),
            "http://api.aviationstack.com/v1/flights?access_key=KEY&flight_icao=BAW123"
        );
        assert_eq!(
            p.build_url("BA123"),
            "http://api.aviationstack.com/v1/flights?access_key=KEY&flight_iata=BA123"
        );
    }

    #[tokio::test]
    async fn test_fetch_uses_first_live_record() {
        let p = AviationStackProvider::new(descriptor(), MockAsyncHttpClient::ok(LIVE)).unwrap();
        let sample = p.fetch("BA123").await.unwrap();

        assert_eq!(sample.latitude(), 51.47);
        assert!((sample.altitude_ft() - 32808.4).abs() < 0.01);
        assert!((sample.ground_speed_kt() - 431.9656).abs() < 1e-3);
        assert_eq!(sample.heading_deg(), 270.0);
        assert_eq!(
            sample.captured_at(),
            DateTime::from_timestamp(1_700_000_000, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_api_error_is_unavailable() {
        let body = r#"{"error":{"code":"usage_limit_reached","message":"Monthly limit reached"}}"#;
        let p = AviationStackProvider::new(descriptor(), MockAsyncHttpClient::ok(body)).unwrap();
        match p.fetch("BA123").await {
            Err(ProviderError::Unavailable { cause, .. }) => {
                assert!(cause.contains("usage_limit_reached"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_live_block_is_not_found() {
        let body = r#"{"data":[{"live":null}]}"#;
        let p = AviationStackProvider::new(descriptor(), MockAsyncHttpClient::ok(body)).unwrap();
        assert!(matches!(
            p.fetch("BA123").await,
            Err(ProviderError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_hex_query_not_supported() {
        let mock = MockAsyncHttpClient::ok(LIVE);
        let p = AviationStackProvider::new(descriptor(), mock.clone()).unwrap();
        assert!(matches!(
            p.fetch("icao24:4ca7b3").await,
            Err(ProviderError::NotFound { .. })
        ));
        assert_eq!(mock.request_count(), 0);
    }
}
