//! Admin route handlers: service areas and delivery assignment.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use ahmed_mart_core::service_area::{NewServiceArea, ServiceArea};
use ahmed_mart_core::{DeliveryPartnerId, OrderId, ServiceAreaId};

use crate::db::ServiceAreaRepository;
use crate::error::{AppError, Result};
use crate::middleware::{AdminOnly, RequireRole};
use crate::models::Order;
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Assignment payload.
#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub delivery_partner_id: DeliveryPartnerId,
}

/// Every service area, active or not.
pub async fn service_areas(
    State(state): State<AppState>,
    _admin: RequireRole<AdminOnly>,
) -> Result<Json<Vec<ServiceArea>>> {
    let areas = ServiceAreaRepository::new(state.pool()).list().await?;
    Ok(Json(areas))
}

/// Add a service area.
#[instrument(skip(state, admin, area), fields(user_id = %admin.user.id))]
pub async fn create_service_area(
    State(state): State<AppState>,
    admin: RequireRole<AdminOnly>,
    Json(area): Json<NewServiceArea>,
) -> Result<(StatusCode, Json<ServiceArea>)> {
    area.validate()?;
    let created = ServiceAreaRepository::new(state.pool()).create(&area).await?;
    tracing::info!(area_id = %created.id, name = %created.name, "Service area created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace a service area.
#[instrument(skip(state, admin, area), fields(user_id = %admin.user.id))]
pub async fn update_service_area(
    State(state): State<AppState>,
    admin: RequireRole<AdminOnly>,
    Path(id): Path<ServiceAreaId>,
    Json(area): Json<NewServiceArea>,
) -> Result<Json<ServiceArea>> {
    area.validate()?;
    let updated = ServiceAreaRepository::new(state.pool())
        .update(id, &area)
        .await?;
    Ok(Json(updated))
}

/// Remove a service area.
#[instrument(skip(state, admin), fields(user_id = %admin.user.id))]
pub async fn delete_service_area(
    State(state): State<AppState>,
    admin: RequireRole<AdminOnly>,
    Path(id): Path<ServiceAreaId>,
) -> Result<StatusCode> {
    if ServiceAreaRepository::new(state.pool()).delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Service area not found".to_string()))
    }
}

/// Hand a ready order to a delivery partner.
#[instrument(skip(state, admin, request), fields(user_id = %admin.user.id))]
pub async fn assign_order(
    State(state): State<AppState>,
    admin: RequireRole<AdminOnly>,
    Path(id): Path<OrderId>,
    Json(request): Json<AssignRequest>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.order_cache())
        .assign_delivery_partner(id, request.delivery_partner_id)
        .await?;
    Ok(Json(order))
}
