//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `ahmed_mart`
//!
//! ## Tables
//!
//! - `products` - Catalog lines the cart joins against
//! - `cart_items` - Durable per-user cart replica, unique on `(user_id, product_id)`
//! - `user_addresses` - Address book, at most one default per user
//! - `orders` / `order_items` - Placed orders with frozen snapshots
//! - `service_areas` - Circular delivery geofences
//! - `admins`, `vendors`, `delivery_partners` - Role registries keyed by email
//! - `user_roles` - Roles granted to signed-in identities
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p ahmed-mart-cli -- migrate
//! ```

pub mod addresses;
pub mod cart_items;
pub mod orders;
pub mod products;
pub mod roles;
pub mod service_areas;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use cart_items::CartItemRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use roles::RoleRegistryRepository;
pub use service_areas::ServiceAreaRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-violation into [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
