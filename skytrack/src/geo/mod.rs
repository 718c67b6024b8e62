//! Great-circle geodesy on a spherical Earth.
//!
//! Pure functions for distance, initial bearing and forward projection used by
//! the extrapolation loop to dead-reckon aircraft between real samples. All
//! math assumes a sphere of radius [`EARTH_RADIUS_KM`]; the error against the
//! WGS-84 ellipsoid (under 0.5%) is far below telemetry noise.
//!
//! Inputs are validated once, at [`GeoPoint`] construction. Every operation
//! over `GeoPoint`s is therefore total.
//!
//! # Example
//!
//! ```
//! use skytrack::geo::{destination_point, distance_km, GeoPoint};
//!
//! let heathrow = GeoPoint::new(51.47, -0.45).unwrap();
//! let east = destination_point(&heathrow, 90.0, 100.0).unwrap();
//! assert!((distance_km(&heathrow, &east) - 100.0).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Minimum latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors from geodesy operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude or longitude outside its valid range, or not finite.
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Projection distance was negative or not finite.
    #[error("invalid distance: {0} km")]
    InvalidDistance(f64),

    /// Bearing was not finite.
    #[error("invalid bearing: {0}")]
    InvalidBearing(f64),
}

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting coordinates outside `[-90,90] x [-180,180]`.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(MIN_LAT..=MAX_LAT).contains(&latitude) || !(MIN_LON..=MAX_LON).contains(&longitude)
        {
            return Err(GeoError::InvalidCoordinate {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Great-circle distance between two points in kilometres (haversine).
pub fn distance_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial bearing from `a` towards `b`, in degrees within `[0, 360)`.
///
/// Returns `0.0` when the points coincide.
pub fn bearing_deg(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    normalize_heading(y.atan2(x).to_degrees())
}

/// Projects `distance_km` along `bearing_deg` from `origin` on a great circle.
///
/// The resulting longitude is wrapped into `[-180, 180]`.
pub fn destination_point(
    origin: &GeoPoint,
    bearing_deg: f64,
    distance_km: f64,
) -> Result<GeoPoint, GeoError> {
    if !distance_km.is_finite() || distance_km < 0.0 {
        return Err(GeoError::InvalidDistance(distance_km));
    }
    if !bearing_deg.is_finite() {
        return Err(GeoError::InvalidBearing(bearing_deg));
    }

    let delta = distance_km / EARTH_RADIUS_KM;
    let theta = bearing_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let sin_lat2 = lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos();
    let lat2 = sin_lat2.clamp(-1.0, 1.0).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

    let latitude = lat2.to_degrees().clamp(MIN_LAT, MAX_LAT);
    let longitude = wrap_longitude(lon2.to_degrees());

    GeoPoint::new(latitude, longitude)
}

/// Normalizes any finite angle into `[0, 360)`. Non-finite input maps to `0`.
pub fn normalize_heading(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    let h = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

fn wrap_longitude(degrees: f64) -> f64 {
    let wrapped = (degrees + 180.0).rem_euclid(360.0) - 180.0;
    wrapped.clamp(MIN_LON, MAX_LON)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range_latitude() {
        let result = GeoPoint::new(90.5, 0.0);
        assert!(matches!(result, Err(GeoError::InvalidCoordinate { .. })));
    }

    #[test]
    fn test_rejects_out_of_range_longitude() {
        assert!(GeoPoint::new(0.0, -180.01).is_err());
        assert!(GeoPoint::new(0.0, 181.0).is_err());
    }

    #[test]
    fn test_rejects_nan() {
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_accepts_boundaries() {
        assert!(GeoPoint::new(-90.0, -180.0).is_ok());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
    }

    #[test]
    fn test_known_distance_london_paris() {
        // LHR to CDG is roughly 348 km
        let lhr = point(51.4700, -0.4543);
        let cdg = point(49.0097, 2.5479);
        let d = distance_km(&lhr, &cdg);
        assert!((d - 348.0).abs() < 3.0, "got {d}");
    }

    #[test]
    fn test_one_degree_of_longitude_at_equator() {
        let d = distance_km(&point(0.0, 0.0), &point(0.0, 1.0));
        assert!((d - 111.195).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = point(0.0, 0.0);
        assert!((bearing_deg(&origin, &point(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_deg(&origin, &point(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(&origin, &point(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(&origin, &point(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_destination_zero_distance_is_origin() {
        let origin = point(51.47, -0.45);
        let dest = destination_point(&origin, 123.0, 0.0).unwrap();
        assert!((dest.latitude() - origin.latitude()).abs() < 1e-12);
        assert!((dest.longitude() - origin.longitude()).abs() < 1e-12);
    }

    #[test]
    fn test_destination_wraps_antimeridian() {
        let origin = point(0.0, 179.9);
        let dest = destination_point(&origin, 90.0, 50.0).unwrap();
        assert!(dest.longitude() < -179.0, "got {}", dest.longitude());
    }

    #[test]
    fn test_destination_rejects_negative_distance() {
        let origin = point(0.0, 0.0);
        assert_eq!(
            destination_point(&origin, 90.0, -1.0),
            Err(GeoError::InvalidDistance(-1.0))
        );
    }

    #[test]
    fn test_destination_rejects_nan_bearing() {
        let origin = point(0.0, 0.0);
        assert!(matches!(
            destination_point(&origin, f64::NAN, 1.0),
            Err(GeoError::InvalidBearing(_))
        ));
    }

    #[test]
    fn test_normalize_heading() {
        assert_eq!(normalize_heading(0.0), 0.0);
        assert_eq!(normalize_heading(360.0), 0.0);
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(725.0), 5.0);
        assert_eq!(normalize_heading(f64::INFINITY), 0.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_distance_is_symmetric(
                lat1 in -90.0..=90.0_f64,
                lon1 in -180.0..=180.0_f64,
                lat2 in -90.0..=90.0_f64,
                lon2 in -180.0..=180.0_f64,
            ) {
                let a = GeoPoint::new(lat1, lon1)?;
                let b = GeoPoint::new(lat2, lon2)?;
                let ab = distance_km(&a, &b);
                let ba = distance_km(&b, &a);
                prop_assert!((ab - ba).abs() < 1e-9, "d(a,b)={} d(b,a)={}", ab, ba);
            }

            #[test]
            fn test_distance_to_self_is_zero(
                lat in -90.0..=90.0_f64,
                lon in -180.0..=180.0_f64,
            ) {
                let a = GeoPoint::new(lat, lon)?;
                prop_assert_eq!(distance_km(&a, &a), 0.0);
            }

            #[test]
            fn test_eastward_projection_stays_on_parallel(
                lat in -60.0..60.0_f64,
                lon in -170.0..170.0_f64,
                km in 0.1..200.0_f64,
            ) {
                let origin = GeoPoint::new(lat, lon)?;
                let dest = destination_point(&origin, 90.0, km)?;
                prop_assert!(
                    dest.longitude() > origin.longitude(),
                    "expected east of {} got {}", origin.longitude(), dest.longitude()
                );
                prop_assert!(
                    (dest.latitude() - origin.latitude()).abs() < 0.5,
                    "latitude drifted from {} to {}", origin.latitude(), dest.latitude()
                );
            }

            #[test]
            fn test_projection_distance_roundtrip(
                lat in -80.0..80.0_f64,
                lon in -180.0..=180.0_f64,
                bearing in 0.0..360.0_f64,
                km in 0.0..1000.0_f64,
            ) {
                let origin = GeoPoint::new(lat, lon)?;
                let dest = destination_point(&origin, bearing, km)?;
                let measured = distance_km(&origin, &dest);
                prop_assert!((measured - km).abs() < 1e-3, "projected {} measured {}", km, measured);
            }
        }
    }
}
