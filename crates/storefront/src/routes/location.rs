//! Location, serviceability and delivery-fee route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use ahmed_mart_core::geo::{GeoPoint, calculate_delivery_fee};
use ahmed_mart_core::service_area::ServiceAreaResolver;

use crate::db::ServiceAreaRepository;
use crate::error::{AppError, Result};
use crate::models::{LocationRecord, session_keys};
use crate::services::geocoding::GeocodedPlace;
use crate::state::AppState;

/// A coordinate pair from the client.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    fn point(self) -> Result<GeoPoint> {
        let point = GeoPoint::new(self.lat, self.lng);
        if point.is_valid() {
            Ok(point)
        } else {
            Err(AppError::BadRequest("Invalid coordinates".to_string()))
        }
    }
}

/// Fee quote query.
#[derive(Debug, Deserialize)]
pub struct FeeQuery {
    pub lat: f64,
    pub lng: f64,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
pub struct Serviceability {
    pub serviceable: bool,
    /// Active areas containing the point.
    pub areas: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FeeQuote {
    pub serviceable: bool,
    pub distance_km: Option<f64>,
    pub delivery_fee: Decimal,
}

#[derive(Debug, Serialize)]
pub struct LocationResponse {
    pub location: LocationRecord,
    pub serviceable: bool,
}

/// Load the resolver over the current active areas.
async fn resolver(state: &AppState) -> Result<ServiceAreaResolver> {
    let areas = ServiceAreaRepository::new(state.pool()).list_active().await?;
    Ok(ServiceAreaResolver::new(areas, state.config().empty_area_policy))
}

/// Whether deliveries reach a point.
pub async fn serviceability(
    State(state): State<AppState>,
    Query(coords): Query<Coordinates>,
) -> Result<Json<Serviceability>> {
    let point = coords.point()?;
    let resolver = resolver(&state).await?;

    Ok(Json(Serviceability {
        serviceable: resolver.is_location_serviceable(point.lat, point.lng),
        areas: resolver
            .containing_areas(point.lat, point.lng)
            .into_iter()
            .map(|a| a.name.clone())
            .collect(),
    }))
}

/// Quote a delivery fee from the distance to the nearest active area.
///
/// With no active areas the distance is unknown and the nearest tier is
/// quoted.
pub async fn delivery_fee(
    State(state): State<AppState>,
    Query(query): Query<FeeQuery>,
) -> Result<Json<FeeQuote>> {
    let point = Coordinates {
        lat: query.lat,
        lng: query.lng,
    }
    .point()?;
    if query.subtotal.is_sign_negative() {
        return Err(AppError::BadRequest("Subtotal cannot be negative".to_string()));
    }

    let resolver = resolver(&state).await?;
    let distance_km = resolver
        .nearest_active_area(point.lat, point.lng)
        .map(|(_, d)| d);

    Ok(Json(FeeQuote {
        serviceable: resolver.is_location_serviceable(point.lat, point.lng),
        distance_km,
        delivery_fee: calculate_delivery_fee(distance_km.unwrap_or(0.0), query.subtotal),
    }))
}

/// The session's cached location, if any.
pub async fn current(session: Session) -> Result<Json<Option<LocationRecord>>> {
    let record = session
        .get::<LocationRecord>(session_keys::LOCATION)
        .await?;
    Ok(Json(record))
}

/// Resolve and cache the user's location.
///
/// A geocoding outage still caches the coordinates so the client can
/// carry on; only the place names are missing.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(coords): Json<Coordinates>,
) -> Result<Json<LocationResponse>> {
    let point = coords.point()?;

    let place = match state.geocoder().reverse(point.lat, point.lng).await {
        Ok(place) => place,
        Err(e) => {
            tracing::warn!(error = %e, "Reverse geocoding failed");
            GeocodedPlace::coordinates_only(point.lat, point.lng)
        }
    };

    let location = LocationRecord {
        lat: point.lat,
        lng: point.lng,
        city: place.city,
        state: place.state,
        full_address: place.full_address,
    };
    session.insert(session_keys::LOCATION, &location).await?;

    let serviceable = resolver(&state)
        .await?
        .is_location_serviceable(point.lat, point.lng);

    Ok(Json(LocationResponse {
        location,
        serviceable,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_coordinates_rejected() {
        let bad = Coordinates {
            lat: 91.0,
            lng: 73.8,
        };
        assert!(matches!(bad.point(), Err(AppError::BadRequest(_))));

        let ok = Coordinates {
            lat: 18.52,
            lng: 73.85,
        };
        assert!(ok.point().is_ok());
    }

    #[test]
    fn test_nan_coordinates_rejected() {
        let bad = Coordinates {
            lat: f64::NAN,
            lng: 73.8,
        };
        assert!(bad.point().is_err());
    }
}
