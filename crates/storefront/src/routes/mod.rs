//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check (main.rs)
//! GET  /health/ready           - Readiness check (main.rs)
//!
//! # Catalog
//! GET  /products               - Available products (JSON)
//!
//! # Cart
//! GET  /cart                   - Cart page (HTML)
//! GET  /api/cart               - Cart with totals
//! POST /api/cart/items         - Add a product
//! PUT  /api/cart/items/{id}    - Set quantity
//! POST /api/cart/items/{id}/increment
//! POST /api/cart/items/{id}/decrement
//! DELETE /api/cart/items/{id}  - Remove a line
//! POST /api/cart/sync          - Reload from the durable cart
//!
//! # Location
//! GET  /api/serviceability     - Is a point inside an active area
//! GET  /api/delivery-fee       - Distance-tiered fee quote
//! GET  /api/location           - Cached location
//! POST /api/location           - Reverse geocode and cache
//!
//! # Addresses and orders (signed in)
//! GET/POST /api/addresses, PUT/DELETE /api/addresses/{id}
//! POST /api/addresses/{id}/default
//! GET/POST /api/orders, GET /api/orders/{id}, POST /api/orders/{id}/cancel
//! GET  /api/me/roles
//!
//! # Vendor / delivery partner / admin
//! GET  /api/vendor/orders, POST /api/vendor/orders/{id}/status
//! GET  /api/delivery/orders, POST /api/delivery/orders/{id}/status
//! GET/POST /api/admin/service-areas, PUT/DELETE /api/admin/service-areas/{id}
//! POST /api/admin/orders/{id}/assign
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/login             - Password sign-in
//! POST /auth/register          - Sign up
//! GET  /auth/oauth/{provider}  - Start OAuth
//! GET  /auth/callback          - OAuth callback
//! POST /auth/id-token          - ID-token sign-in (JSON)
//! POST /auth/logout            - Sign out
//! ```

pub mod addresses;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod delivery;
pub mod location;
pub mod me;
pub mod orders;
pub mod products;
pub mod vendor;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", post(auth::register))
        .route("/oauth/{provider}", get(auth::oauth_start))
        .route("/callback", get(auth::callback))
        .route("/id-token", post(auth::id_token))
        .route("/logout", post(auth::logout))
}

/// Create the cart API router.
pub fn cart_api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::get))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{product_id}",
            put(cart::update_quantity).delete(cart::remove_item),
        )
        .route("/items/{product_id}/increment", post(cart::increment))
        .route("/items/{product_id}/decrement", post(cart::decrement))
        .route("/sync", post(cart::sync))
}

/// Create the address API router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::index).post(addresses::create))
        .route("/{id}", put(addresses::update).delete(addresses::delete))
        .route("/{id}/default", post(addresses::set_default))
}

/// Create the customer order API router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the admin API router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/service-areas",
            get(admin::service_areas).post(admin::create_service_area),
        )
        .route(
            "/service-areas/{id}",
            put(admin::update_service_area).delete(admin::delete_service_area),
        )
        .route("/orders/{id}/assign", post(admin::assign_order))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/cart", cart_api_routes())
        .nest("/addresses", address_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
        .route("/serviceability", get(location::serviceability))
        .route("/delivery-fee", get(location::delivery_fee))
        .route("/location", get(location::current).post(location::update))
        .route("/vendor/orders", get(vendor::orders))
        .route("/vendor/orders/{id}/status", post(vendor::update_status))
        .route("/delivery/orders", get(delivery::orders))
        .route("/delivery/orders/{id}/status", post(delivery::update_status))
        .route("/me/roles", get(me::roles))
}

/// Create all storefront routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/cart", get(cart::show))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::tests::test_config;

    /// Router over a pool that never connects; only requests rejected before
    /// any query are sent through it.
    fn app() -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/ahmed_mart_test")
            .unwrap();
        routes().with_state(AppState::new(test_config(), pool).unwrap())
    }

    async fn status_of(request: Request<Body>) -> StatusCode {
        app().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_signed_out_api_requests_get_401() {
        for path in [
            "/api/orders",
            "/api/addresses",
            "/api/me/roles",
            "/api/vendor/orders",
            "/api/delivery/orders",
            "/api/admin/service-areas",
        ] {
            let request = Request::get(path).body(Body::empty()).unwrap();
            assert_eq!(status_of(request).await, StatusCode::UNAUTHORIZED, "{path}");
        }
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_before_lookup() {
        let request = Request::get("/api/serviceability?lat=123&lng=73.8")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::BAD_REQUEST);

        let request = Request::get("/api/delivery-fee?lat=18.5&lng=73.8&subtotal=-5")
            .body(Body::empty())
            .unwrap();
        assert_eq!(status_of(request).await, StatusCode::BAD_REQUEST);
    }
}
