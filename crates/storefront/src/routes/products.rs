//! Product route handlers.

use axum::{Json, extract::State};

use crate::db::ProductRepository;
use crate::error::Result;
use crate::models::Product;
use crate::state::AppState;

/// List products that can be added to a cart.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Product>>> {
    let products = ProductRepository::new(state.pool()).list_available().await?;
    Ok(Json(products))
}
