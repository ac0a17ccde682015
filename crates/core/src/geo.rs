//! Great-circle distance and the distance-tiered delivery fee.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by [`haversine_distance`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Subtotal at or above which delivery is free.
pub const FREE_DELIVERY_THRESHOLD: Decimal = Decimal::from_parts(199, 0, 0, false, 0);

/// Distance tiers as `(upper bound in km, fee)`. Bounds are inclusive.
const FEE_TIERS: [(f64, Decimal); 3] = [
    (2.0, Decimal::from_parts(19, 0, 0, false, 0)),
    (5.0, Decimal::from_parts(29, 0, 0, false, 0)),
    (10.0, Decimal::from_parts(49, 0, 0, false, 0)),
];

/// Fee for anything beyond the last tier.
const FAR_FEE: Decimal = Decimal::from_parts(69, 0, 0, false, 0);

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to `other` in kilometres.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }

    /// Whether both coordinates are finite and inside their valid ranges.
    #[must_use]
    pub fn is_valid(self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Haversine distance between two points given in degrees, in kilometres.
///
/// NaN inputs propagate to a NaN result; callers validate coordinates.
#[must_use]
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Price delivery by distance and order subtotal.
///
/// Free when `subtotal >= 199`; otherwise `<= 2 km → 19`, `<= 5 km → 29`,
/// `<= 10 km → 49`, beyond that `69`. This only prices a delivery; whether
/// the location is served at all is decided by the service-area resolver.
#[must_use]
pub fn calculate_delivery_fee(distance_km: f64, subtotal: Decimal) -> Decimal {
    if subtotal >= FREE_DELIVERY_THRESHOLD {
        return Decimal::ZERO;
    }

    FEE_TIERS
        .iter()
        .find(|(max_km, _)| distance_km <= *max_km)
        .map_or(FAR_FEE, |(_, fee)| *fee)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fee(distance_km: f64, subtotal: i64) -> Decimal {
        calculate_delivery_fee(distance_km, Decimal::from(subtotal))
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        for (lat, lng) in [(12.9716, 77.5946), (-33.86, 151.2), (0.0, 0.0), (89.9, -179.9)] {
            assert!(haversine_distance(lat, lng, lat, lng).abs() < 1e-9);
        }
    }

    #[test]
    fn test_known_distance() {
        // Bengaluru MG Road to Kempegowda airport, about 27 km as the crow flies.
        let d = haversine_distance(12.9756, 77.6050, 13.1986, 77.7066);
        assert!((d - 26.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(28.6139, 77.2090);
        let b = GeoPoint::new(19.0760, 72.8777);
        assert!((a.distance_to(b) - b.distance_to(a)).abs() < 1e-9);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(haversine_distance(f64::NAN, 0.0, 0.0, 0.0).is_nan());
    }

    #[test]
    fn test_free_at_or_above_threshold() {
        for distance in [0.0, 3.0, 10.0, 500.0] {
            assert_eq!(fee(distance, 199), Decimal::ZERO);
            assert_eq!(fee(distance, 1000), Decimal::ZERO);
        }
    }

    #[test]
    fn test_tier_boundaries_are_inclusive() {
        assert_eq!(fee(0.0, 100), Decimal::from(19));
        assert_eq!(fee(2.0, 100), Decimal::from(19));
        assert_eq!(fee(2.01, 100), Decimal::from(29));
        assert_eq!(fee(5.0, 100), Decimal::from(29));
        assert_eq!(fee(10.0, 100), Decimal::from(49));
        assert_eq!(fee(10.001, 100), Decimal::from(69));
        assert_eq!(fee(250.0, 198), Decimal::from(69));
    }

    #[test]
    fn test_geo_point_validity() {
        assert!(GeoPoint::new(12.0, 77.0).is_valid());
        assert!(!GeoPoint::new(91.0, 77.0).is_valid());
        assert!(!GeoPoint::new(12.0, f64::INFINITY).is_valid());
    }
}
