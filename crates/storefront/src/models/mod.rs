//! Domain models for storefront.
//!
//! Row types derive `sqlx::FromRow` and map straight onto the tables in
//! `crates/storefront/migrations`; session types live in [`session`].

pub mod address;
pub mod order;
pub mod product;
pub mod session;

pub use address::{Address, AddressError, AddressInput};
pub use order::{Order, OrderItem, OrderWithItems};
pub use product::Product;
pub use session::{CurrentUser, LocationRecord, PendingOAuth, keys as session_keys};
