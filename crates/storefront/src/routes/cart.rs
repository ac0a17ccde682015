//! Cart route handlers.
//!
//! Every mutation applies to the session snapshot first; for a signed-in
//! user the durable cart table is then updated. A failed remote write is
//! logged and reported in the response but never undoes the local change.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use ahmed_mart_core::ProductId;

use crate::db::{ProductRepository, RepositoryError};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::services::cart::{self, CartView, RemoteSync, SessionCartStore};
use crate::state::AppState;

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub view: CartView,
    pub signed_in: bool,
}

/// Add-to-cart payload.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
}

/// Set-quantity payload. Zero or less removes the line.
#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest {
    pub quantity: i64,
}

/// Cart response: the view plus whether the durable copy kept up.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    #[serde(flatten)]
    pub cart: CartView,
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_error: Option<String>,
}

impl CartResponse {
    fn new(store: &SessionCartStore<'_>, sync: RemoteSync) -> Self {
        let sync_error = match sync {
            RemoteSync::Failed(reason) => Some(reason),
            RemoteSync::Synced | RemoteSync::Skipped => None,
        };
        Self {
            cart: CartView::from(store.cart()),
            synced: sync_error.is_none(),
            sync_error,
        }
    }
}

/// Display the cart page.
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<impl IntoResponse> {
    let store = cart::open(&session, state.pool(), user.as_ref()).await?;
    Ok(CartShowTemplate {
        view: CartView::from(store.cart()),
        signed_in: user.is_some(),
    })
}

/// Current cart as JSON.
pub async fn get(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartResponse>> {
    let store = cart::open(&session, state.pool(), user.as_ref()).await?;
    Ok(Json(CartResponse::new(&store, RemoteSync::Skipped)))
}

/// Add one unit of a product.
#[instrument(skip(state, session, user))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Json(request): Json<AddItemRequest>,
) -> Result<Json<CartResponse>> {
    let product = ProductRepository::new(state.pool())
        .get_available(request.product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => AppError::NotFound("Product not found".to_string()),
            other => other.into(),
        })?;

    let product_id = product.id.to_string();
    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));

    let mut store = cart::open(&session, state.pool(), user.as_ref()).await?;
    let sync = store.add_item(product.to_cart_item()).await?;
    Ok(Json(CartResponse::new(&store, sync)))
}

/// Set a line's quantity.
#[instrument(skip(state, session, user))]
pub async fn update_quantity(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
    Json(request): Json<SetQuantityRequest>,
) -> Result<Json<CartResponse>> {
    let mut store = cart::open(&session, state.pool(), user.as_ref()).await?;
    let sync = store.update_quantity(product_id, request.quantity).await?;
    Ok(Json(CartResponse::new(&store, sync)))
}

/// Add one to a line, up to its limit.
pub async fn increment(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartResponse>> {
    let mut store = cart::open(&session, state.pool(), user.as_ref()).await?;
    let sync = store.increment_quantity(product_id).await?;
    Ok(Json(CartResponse::new(&store, sync)))
}

/// Take one from a line, removing it at zero.
pub async fn decrement(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartResponse>> {
    let mut store = cart::open(&session, state.pool(), user.as_ref()).await?;
    let sync = store.decrement_quantity(product_id).await?;
    Ok(Json(CartResponse::new(&store, sync)))
}

/// Remove a line.
#[instrument(skip(state, session, user))]
pub async fn remove_item(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(product_id): Path<ProductId>,
) -> Result<Json<CartResponse>> {
    let mut store = cart::open(&session, state.pool(), user.as_ref()).await?;
    let sync = store.remove_item(product_id).await?;
    Ok(Json(CartResponse::new(&store, sync)))
}

/// Replace the session cart with the durable copy.
pub async fn sync(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Result<Json<CartResponse>> {
    let mut store = cart::open(&session, state.pool(), user.as_ref()).await?;
    let sync = store.fetch_cart().await?;
    Ok(Json(CartResponse::new(&store, sync)))
}

#[cfg(test)]
mod tests {
    use ahmed_mart_core::cart::Cart;

    use super::*;

    #[test]
    fn test_cart_page_renders_empty_state() {
        let page = CartShowTemplate {
            view: CartView::from(&Cart::new()),
            signed_in: false,
        };
        let html = page.render().unwrap_or_default();
        assert!(html.contains("Your cart is empty"));
        assert!(html.contains("Sign in"));
    }
}
