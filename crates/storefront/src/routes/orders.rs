//! Customer order route handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tower_sessions::Session;
use tracing::instrument;

use ahmed_mart_core::OrderId;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{Order, OrderWithItems};
use crate::services::cart;
use crate::services::orders::{CreateOrderRequest, OrderService};
use crate::state::AppState;

/// The customer's orders, newest first.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Arc<Vec<OrderWithItems>>>> {
    let orders = OrderService::new(state.pool(), state.order_cache())
        .list_for_customer(user.id)
        .await?;
    Ok(Json(orders))
}

/// Place an order from the cart.
#[instrument(skip(state, session, user, request), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderWithItems>)> {
    let mut store = cart::open(&session, state.pool(), Some(&user)).await?;
    let order = OrderService::new(state.pool(), state.order_cache())
        .create_order(&user, &mut store, &request, state.config().empty_area_policy)
        .await?;
    add_breadcrumb(
        "order",
        "Order placed",
        Some(&[("order_number", order.order.order_number.as_str())]),
    );
    Ok((StatusCode::CREATED, Json(order)))
}

/// One of the customer's orders.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderWithItems>> {
    let order = OrderService::new(state.pool(), state.order_cache())
        .get_for_customer(user.id, id)
        .await?;
    Ok(Json(order))
}

/// Cancel a pending order.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.order_cache())
        .cancel_order(user.id, id)
        .await?;
    Ok(Json(order))
}
