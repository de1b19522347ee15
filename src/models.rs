// Core data structures for the school directory

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

/// Stored school record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl School {
    /// Location of the school
    ///
    /// Rows are range-checked on insert; out-of-range values found in the
    /// store are clamped.
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude).unwrap_or_else(|_| {
            tracing::warn!(
                id = self.id,
                latitude = self.latitude,
                longitude = self.longitude,
                "Stored school has invalid coordinates, clamping"
            );
            Coordinate::saturating(self.latitude, self.longitude)
        })
    }
}

/// Validated payload for a new school
///
/// Produced by [`crate::validation::parse_new_school`]; strings are trimmed
/// and non-empty, coordinates are range-checked.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSchool {
    pub name: String,
    pub address: String,
    pub location: Coordinate,
}

impl NewSchool {
    pub fn latitude(&self) -> f64 {
        self.location.latitude()
    }

    pub fn longitude(&self) -> f64 {
        self.location.longitude()
    }

    /// Build the stored representation once the store has assigned an id
    pub fn into_school(self, id: i64) -> School {
        School {
            id,
            latitude: self.latitude(),
            longitude: self.longitude(),
            name: self.name,
            address: self.address,
            created_at: None,
            updated_at: None,
        }
    }
}

/// School annotated with its distance from a query point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSchool {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Kilometers, rounded to two decimals
    pub distance: f64,
}

impl RankedSchool {
    pub fn new(school: &School, distance: f64) -> Self {
        Self {
            id: school.id,
            name: school.name.clone(),
            address: school.address.clone(),
            latitude: school.latitude,
            longitude: school.longitude,
            distance,
        }
    }
}
