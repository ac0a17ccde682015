//! Delivery partner route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use tracing::instrument;

use ahmed_mart_core::{DeliveryPartnerId, OrderId};

use crate::db::RoleRegistryRepository;
use crate::error::{AppError, Result};
use crate::middleware::{DeliveryOnly, RequireRole};
use crate::models::{CurrentUser, Order, OrderWithItems};
use crate::routes::vendor::StatusUpdate;
use crate::services::orders::{OrderActor, OrderService};
use crate::state::AppState;

async fn partner_id(state: &AppState, user: &CurrentUser) -> Result<DeliveryPartnerId> {
    RoleRegistryRepository::new(state.pool())
        .delivery_partner_id_for(&user.email)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden("No delivery partner record for this account".to_string())
        })
}

/// Orders assigned to the signed-in delivery partner.
pub async fn orders(
    State(state): State<AppState>,
    RequireRole { user, .. }: RequireRole<DeliveryOnly>,
) -> Result<Json<Vec<OrderWithItems>>> {
    let partner_id = partner_id(&state, &user).await?;
    let orders = OrderService::new(state.pool(), state.order_cache())
        .list_for_delivery_partner(partner_id)
        .await?;
    Ok(Json(orders))
}

/// Record pickup and delivery progress.
#[instrument(skip(state, user, update), fields(user_id = %user.id, status = %update.status))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireRole { user, .. }: RequireRole<DeliveryOnly>,
    Path(id): Path<OrderId>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let partner_id = partner_id(&state, &user).await?;
    let order = OrderService::new(state.pool(), state.order_cache())
        .advance_status(OrderActor::DeliveryPartner(partner_id), id, update.status)
        .await?;
    Ok(Json(order))
}
