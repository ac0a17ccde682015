//! Service area commands.
//!
//! # Usage
//!
//! ```bash
//! am-cli service-area add -n "Pune Central" --lat 18.5204 --lng 73.8567 -r 8
//! am-cli service-area list
//! ```

use ahmed_mart_core::service_area::NewServiceArea;
use ahmed_mart_storefront::db::ServiceAreaRepository;

use super::{CommandError, connect};

/// Create a service area.
///
/// # Errors
///
/// Returns `CommandError::InvalidArgument` if the geofence is invalid.
pub async fn add(
    name: &str,
    lat: f64,
    lng: f64,
    radius_km: f64,
    inactive: bool,
) -> Result<(), CommandError> {
    let area = NewServiceArea {
        name: name.to_string(),
        center_latitude: lat,
        center_longitude: lng,
        radius_km,
        is_active: !inactive,
    };
    area.validate()
        .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;

    let pool = connect().await?;
    let created = ServiceAreaRepository::new(&pool).create(&area).await?;

    tracing::info!(
        id = %created.id,
        name = %created.name,
        radius_km = created.radius_km,
        active = created.is_active,
        "Service area created"
    );
    Ok(())
}

/// Log every service area.
///
/// # Errors
///
/// Returns `CommandError` if the query fails.
pub async fn list() -> Result<(), CommandError> {
    let pool = connect().await?;
    let areas = ServiceAreaRepository::new(&pool).list().await?;

    if areas.is_empty() {
        tracing::info!("No service areas; serviceability follows SERVICE_AREA_EMPTY_POLICY");
    }
    for area in areas {
        tracing::info!(
            id = %area.id,
            name = %area.name,
            lat = area.center_latitude,
            lng = area.center_longitude,
            radius_km = area.radius_km,
            active = area.is_active,
            "Service area"
        );
    }
    Ok(())
}
