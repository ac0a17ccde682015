//! Circular delivery geofences and serviceability checks.
//!
//! A location is serviceable when it falls inside at least one *active*
//! area. What happens when no area is active is an explicit policy
//! ([`EmptyAreaPolicy`]) rather than an incidental fallthrough: during early
//! rollout the store serves everywhere until zones are configured.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ServiceAreaId;
use crate::geo::{GeoPoint, haversine_distance};

/// A circular geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceArea {
    pub id: ServiceAreaId,
    pub name: String,
    pub center_latitude: f64,
    pub center_longitude: f64,
    /// Always `> 0`.
    pub radius_km: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ServiceArea {
    #[must_use]
    pub const fn center(&self) -> GeoPoint {
        GeoPoint::new(self.center_latitude, self.center_longitude)
    }

    /// Distance from the area's center to a point, in kilometres.
    #[must_use]
    pub fn distance_from_center(&self, lat: f64, lng: f64) -> f64 {
        haversine_distance(self.center_latitude, self.center_longitude, lat, lng)
    }

    /// Whether the point lies inside (or on the edge of) this circle.
    #[must_use]
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        self.distance_from_center(lat, lng) <= self.radius_km
    }
}

/// Errors from validating service-area input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceAreaError {
    #[error("service area name cannot be empty")]
    EmptyName,
    #[error("radius must be greater than zero (got {0})")]
    NonPositiveRadius(f64),
    #[error("center coordinates are out of range")]
    InvalidCenter,
}

/// Input for creating or replacing a service area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewServiceArea {
    pub name: String,
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub radius_km: f64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl NewServiceArea {
    /// Check the geofence invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceAreaError`] for a blank name, a radius that is not
    /// strictly positive (NaN included), or an out-of-range center.
    pub fn validate(&self) -> Result<(), ServiceAreaError> {
        if self.name.trim().is_empty() {
            return Err(ServiceAreaError::EmptyName);
        }
        if !(self.radius_km > 0.0 && self.radius_km.is_finite()) {
            return Err(ServiceAreaError::NonPositiveRadius(self.radius_km));
        }
        if !GeoPoint::new(self.center_latitude, self.center_longitude).is_valid() {
            return Err(ServiceAreaError::InvalidCenter);
        }
        Ok(())
    }
}

/// What to answer when there are no active service areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyAreaPolicy {
    /// Serve every location until at least one area is active.
    #[default]
    ServeEverywhere,
    /// Serve nowhere until at least one area is active.
    ServeNowhere,
}

impl std::str::FromStr for EmptyAreaPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "serve_everywhere" => Ok(Self::ServeEverywhere),
            "serve_nowhere" => Ok(Self::ServeNowhere),
            _ => Err(format!("invalid empty-area policy: {s}")),
        }
    }
}

/// Answers containment queries over a loaded set of areas.
///
/// The set itself is owned by the database; this is a read-only view over
/// whatever was last fetched.
#[derive(Debug, Clone)]
pub struct ServiceAreaResolver {
    active: Vec<ServiceArea>,
    policy: EmptyAreaPolicy,
}

impl ServiceAreaResolver {
    /// Build a resolver, keeping only active areas.
    #[must_use]
    pub fn new(areas: impl IntoIterator<Item = ServiceArea>, policy: EmptyAreaPolicy) -> Self {
        Self {
            active: areas.into_iter().filter(|a| a.is_active).collect(),
            policy,
        }
    }

    /// The active areas this resolver considers.
    #[must_use]
    pub fn active_areas(&self) -> &[ServiceArea] {
        &self.active
    }

    #[must_use]
    pub const fn policy(&self) -> EmptyAreaPolicy {
        self.policy
    }

    /// Whether a delivery to `(lat, lng)` can be offered.
    #[must_use]
    pub fn is_location_serviceable(&self, lat: f64, lng: f64) -> bool {
        if self.active.is_empty() {
            return self.policy == EmptyAreaPolicy::ServeEverywhere;
        }
        self.active.iter().any(|area| area.contains(lat, lng))
    }

    /// All active areas that contain the point.
    #[must_use]
    pub fn containing_areas(&self, lat: f64, lng: f64) -> Vec<&ServiceArea> {
        self.active
            .iter()
            .filter(|area| area.contains(lat, lng))
            .collect()
    }

    /// The active area whose center is closest to the point, with that distance.
    #[must_use]
    pub fn nearest_active_area(&self, lat: f64, lng: f64) -> Option<(&ServiceArea, f64)> {
        self.active
            .iter()
            .map(|area| (area, area.distance_from_center(lat, lng)))
            .filter(|(_, d)| !d.is_nan())
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
    }
}
