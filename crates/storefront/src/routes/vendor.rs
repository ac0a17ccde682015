//! Vendor route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use ahmed_mart_core::{OrderId, OrderStatus, VendorId};

use crate::db::RoleRegistryRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireRole, VendorOnly};
use crate::models::{CurrentUser, Order, OrderWithItems};
use crate::services::orders::{OrderActor, OrderService};
use crate::state::AppState;

/// Status change payload, shared with the delivery routes.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

async fn vendor_id(state: &AppState, user: &CurrentUser) -> Result<VendorId> {
    RoleRegistryRepository::new(state.pool())
        .vendor_id_for(&user.email)
        .await?
        .ok_or_else(|| AppError::Forbidden("No vendor record for this account".to_string()))
}

/// Orders routed to the signed-in vendor.
pub async fn orders(
    State(state): State<AppState>,
    RequireRole { user, .. }: RequireRole<VendorOnly>,
) -> Result<Json<Vec<OrderWithItems>>> {
    let vendor_id = vendor_id(&state, &user).await?;
    let orders = OrderService::new(state.pool(), state.order_cache())
        .list_for_vendor(vendor_id)
        .await?;
    Ok(Json(orders))
}

/// Move one of the vendor's orders along.
#[instrument(skip(state, user, update), fields(user_id = %user.id, status = %update.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireRole { user, .. }: RequireRole<VendorOnly>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let vendor_id = vendor_id(&state, &user).await?;
    let order = OrderService::new(state.pool(), state.order_cache())
        .advance_status(OrderActor::Vendor(vendor_id), id, update.status)
        .await?;
    Ok(Json(order))
}
