//! Proximity ranking
//!
//! Great-circle distances between coordinates and the ordering of stored
//! schools around a caller-supplied origin.
//!
//! # Example
//!
//! ```
//! use schoolmap::geo::{haversine_km, Coordinate};
//!
//! let bangalore = Coordinate::new(12.9716, 77.5946).unwrap();
//! let mysore = Coordinate::new(12.2958, 76.6394).unwrap();
//!
//! let km = haversine_km(bangalore, mysore);
//! assert!(km > 120.0 && km < 130.0);
//! ```

use serde::Serialize;

use crate::models::{RankedSchool, School};
use crate::validation::ValidationError;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Valid latitude range in degrees
pub const LATITUDE_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;

/// Valid longitude range in degrees
pub const LONGITUDE_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

// ============================================================================
// Coordinate
// ============================================================================

/// A range-checked point on the globe, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(ValidationError::InvalidNumber);
        }

        if !LATITUDE_RANGE.contains(&latitude) || !LONGITUDE_RANGE.contains(&longitude) {
            return Err(ValidationError::OutOfRange);
        }

        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Clamp into the valid ranges; non-finite components become 0
    pub(crate) fn saturating(latitude: f64, longitude: f64) -> Self {
        let clamp = |v: f64, range: &std::ops::RangeInclusive<f64>| {
            if v.is_finite() {
                v.clamp(*range.start(), *range.end())
            } else {
                0.0
            }
        };

        Self {
            latitude: clamp(latitude, &LATITUDE_RANGE),
            longitude: clamp(longitude, &LONGITUDE_RANGE),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

// ============================================================================
// Distance
// ============================================================================

/// Haversine great-circle distance in kilometers
///
/// `a` is clamped to `[0, 1]` so rounding drift near antipodal points cannot
/// push `sqrt(1 - a)` into NaN.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = ((d_lat / 2.0).sin().powi(2)
        + from.latitude.to_radians().cos()
            * to.latitude.to_radians().cos()
            * (d_lon / 2.0).sin().powi(2))
    .clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Round to two decimal places, half away from zero
pub fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}

// ============================================================================
// Ranking
// ============================================================================

/// Rank schools by ascending distance from `origin`
///
/// Distances are rounded before sorting, and the sort is stable, so schools
/// at the same rounded distance keep their store order.
pub fn rank(origin: Coordinate, schools: &[School]) -> Vec<RankedSchool> {
    let mut ranked: Vec<RankedSchool> = schools
        .iter()
        .map(|school| {
            let distance = round_km(haversine_km(origin, school.coordinate()));
            RankedSchool::new(school, distance)
        })
        .collect();

    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn school(id: i64, lat: f64, lon: f64) -> School {
        School {
            id,
            name: format!("School {id}"),
            address: format!("{id} Main Road"),
            latitude: lat,
            longitude: lon,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_coordinate_bounds_are_inclusive() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_coordinate_out_of_range() {
        assert_eq!(
            Coordinate::new(90.0001, 0.0),
            Err(ValidationError::OutOfRange)
        );
        assert_eq!(
            Coordinate::new(0.0, -180.5),
            Err(ValidationError::OutOfRange)
        );
    }

    #[test]
    fn test_coordinate_rejects_non_finite() {
        assert_eq!(
            Coordinate::new(f64::NAN, 0.0),
            Err(ValidationError::InvalidNumber)
        );
        assert_eq!(
            Coordinate::new(0.0, f64::INFINITY),
            Err(ValidationError::InvalidNumber)
        );
    }

    #[test]
    fn test_same_point_is_zero() {
        let p = coord(12.9716, 77.5946);
        assert_eq!(haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // 2 * pi * 6371 / 360
        let d = haversine_km(coord(0.0, 0.0), coord(1.0, 0.0));
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_antipodal_points() {
        let d = haversine_km(coord(0.0, 0.0), coord(0.0, 180.0));
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_KM;
        assert!(d.is_finite());
        assert!((d - half_circumference).abs() < 1e-6);

        let poles = haversine_km(coord(90.0, 0.0), coord(-90.0, 0.0));
        assert!((poles - half_circumference).abs() < 1e-6);
    }

    #[test]
    fn test_antimeridian_is_short() {
        let d = haversine_km(coord(0.0, 179.5), coord(0.0, -179.5));
        assert!((d - 111.19).abs() < 0.01, "got {d}");
    }

    #[test]
    fn test_round_km() {
        assert_eq!(round_km(1.234), 1.23);
        assert_eq!(round_km(1.236), 1.24);
        assert_eq!(round_km(0.0), 0.0);
        assert_eq!(round_km(12.5), 12.5);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(coord(0.0, 0.0), &[]).is_empty());
    }

    #[test]
    fn test_rank_orders_by_distance() {
        let schools = vec![
            school(1, 10.0, 10.0),
            school(2, 0.0, 0.0),
            school(3, 1.0, 1.0),
        ];

        let ranked = rank(coord(0.0, 0.0), &schools);
        let ids: Vec<i64> = ranked.iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(ranked[0].distance, 0.0);
    }

    #[test]
    fn test_rank_is_stable_for_ties() {
        let schools = vec![
            school(7, 1.0, 0.0),
            school(3, -1.0, 0.0),
            school(5, 1.0, 0.0),
        ];

        let ranked = rank(coord(0.0, 0.0), &schools);
        let ids: Vec<i64> = ranked.iter().map(|r| r.id).collect();

        assert_eq!(ids, vec![7, 3, 5]);
    }

    #[test]
    fn test_rank_leaves_input_untouched() {
        let schools = vec![school(1, 5.0, 5.0), school(2, 0.0, 0.0)];
        let before = schools.clone();

        let _ = rank(coord(0.0, 0.0), &schools);

        assert_eq!(schools, before);
    }
}
