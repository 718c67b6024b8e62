//! The common telemetry sample type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::{normalize_heading, GeoError, GeoPoint};

/// Where a sample came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSource {
    /// Reported by a telemetry provider.
    Live {
        /// Name of the provider that answered.
        provider: String,
    },
    /// Computed by dead reckoning from an anchor sample.
    Derived,
}

/// One aircraft state fix.
///
/// Immutable once created. Construction enforces the sample invariants:
/// coordinates in range, heading in `[0, 360)` and ground speed `>= 0`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    #[serde(flatten)]
    position: GeoPoint,
    altitude_ft: f64,
    ground_speed_kt: f64,
    heading_deg: f64,
    captured_at: DateTime<Utc>,
    source: SampleSource,
}

impl TelemetrySample {
    /// Creates a sample at a validated position.
    ///
    /// Heading is normalized into `[0, 360)`. Negative or non-finite speed
    /// becomes `0`, and a non-finite altitude becomes `0`.
    pub fn new(
        position: GeoPoint,
        altitude_ft: f64,
        ground_speed_kt: f64,
        heading_deg: f64,
        captured_at: DateTime<Utc>,
        source: SampleSource,
    ) -> Self {
        let ground_speed_kt = if ground_speed_kt.is_finite() && ground_speed_kt > 0.0 {
            ground_speed_kt
        } else {
            0.0
        };
        let altitude_ft = if altitude_ft.is_finite() {
            altitude_ft
        } else {
            0.0
        };

        Self {
            position,
            altitude_ft,
            ground_speed_kt,
            heading_deg: normalize_heading(heading_deg),
            captured_at,
            source,
        }
    }

    /// Creates a live sample from raw provider values.
    pub fn live(
        provider: impl Into<String>,
        latitude: f64,
        longitude: f64,
        altitude_ft: f64,
        ground_speed_kt: f64,
        heading_deg: f64,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, GeoError> {
        let position = GeoPoint::new(latitude, longitude)?;
        Ok(Self::new(
            position,
            altitude_ft,
            ground_speed_kt,
            heading_deg,
            captured_at,
            SampleSource::Live {
                provider: provider.into(),
            },
        ))
    }

    /// Returns a derived copy of this sample moved to `position` at `captured_at`.
    ///
    /// Altitude, speed and heading are carried over unchanged.
    pub fn derive(&self, position: GeoPoint, captured_at: DateTime<Utc>) -> Self {
        Self {
            position,
            altitude_ft: self.altitude_ft,
            ground_speed_kt: self.ground_speed_kt,
            heading_deg: self.heading_deg,
            captured_at,
            source: SampleSource::Derived,
        }
    }

    pub fn position(&self) -> GeoPoint {
        self.position
    }

    pub fn latitude(&self) -> f64 {
        self.position.latitude()
    }

    pub fn longitude(&self) -> f64 {
        self.position.longitude()
    }

    pub fn altitude_ft(&self) -> f64 {
        self.altitude_ft
    }

    pub fn ground_speed_kt(&self) -> f64 {
        self.ground_speed_kt
    }

    pub fn heading_deg(&self) -> f64 {
        self.heading_deg
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn source(&self) -> &SampleSource {
        &self.source
    }

    /// True when produced by dead reckoning rather than a provider.
    pub fn is_derived(&self) -> bool {
        matches!(self.source, SampleSource::Derived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_live_sample_keeps_fields() {
        let s = TelemetrySample::live("adsb_lol", 51.47, -0.45, 35000.0, 450.0, 90.0, ts()).unwrap();
        assert_eq!(s.latitude(), 51.47);
        assert_eq!(s.longitude(), -0.45);
        assert_eq!(s.altitude_ft(), 35000.0);
        assert_eq!(s.ground_speed_kt(), 450.0);
        assert_eq!(s.heading_deg(), 90.0);
        assert_eq!(s.captured_at(), ts());
        assert!(!s.is_derived());
        assert_eq!(
            s.source(),
            &SampleSource::Live {
                provider: "adsb_lol".to_string()
            }
        );
    }

    #[test]
    fn test_live_sample_rejects_bad_coordinates() {
        assert!(TelemetrySample::live("p", 91.0, 0.0, 0.0, 0.0, 0.0, ts()).is_err());
    }

    #[test]
    fn test_heading_is_normalized() {
        let s = TelemetrySample::live("p", 0.0, 0.0, 0.0, 100.0, 360.0, ts()).unwrap();
        assert_eq!(s.heading_deg(), 0.0);
        let s = TelemetrySample::live("p", 0.0, 0.0, 0.0, 100.0, -45.0, ts()).unwrap();
        assert_eq!(s.heading_deg(), 315.0);
    }

    #[test]
    fn test_negative_and_nan_speed_become_zero() {
        let s = TelemetrySample::live("p", 0.0, 0.0, 0.0, -3.0, 0.0, ts()).unwrap();
        assert_eq!(s.ground_speed_kt(), 0.0);
        let s = TelemetrySample::live("p", 0.0, 0.0, f64::NAN, f64::NAN, 0.0, ts()).unwrap();
        assert_eq!(s.ground_speed_kt(), 0.0);
        assert_eq!(s.altitude_ft(), 0.0);
    }

    #[test]
    fn test_derive_carries_kinematics() {
        let anchor = TelemetrySample::live("p", 10.0, 10.0, 1000.0, 200.0, 45.0, ts()).unwrap();
        let moved = GeoPoint::new(10.1, 10.1).unwrap();
        let later = ts() + chrono::Duration::seconds(5);
        let derived = anchor.derive(moved, later);

        assert!(derived.is_derived());
        assert_eq!(derived.position(), moved);
        assert_eq!(derived.captured_at(), later);
        assert_eq!(derived.altitude_ft(), 1000.0);
        assert_eq!(derived.ground_speed_kt(), 200.0);
        assert_eq!(derived.heading_deg(), 45.0);
    }

    #[test]
    fn test_serializes_flat_position() {
        let s = TelemetrySample::live("p", 1.5, 2.5, 0.0, 0.0, 0.0, ts()).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["latitude"], 1.5);
        assert_eq!(json["longitude"], 2.5);
        assert_eq!(json["source"]["live"]["provider"], "p");
    }
}
