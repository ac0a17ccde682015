//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, request transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication and role checks are extractors rather than layers, so each
//! handler declares exactly what it needs.

pub mod auth;
pub mod session;

pub use auth::{
    AdminOnly, DeliveryOnly, OptionalAuth, RequireAuth, RequireRole, RoleRequirement, VendorOnly,
    clear_current_user, set_current_user,
};
pub use session::create_session_layer;
