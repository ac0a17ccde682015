//! Business logic services for storefront.
//!
//! # Services
//!
//! - `access` - Role admission and resolution against the registries
//! - `auth` - Hosted auth provider client (password, OAuth, ID token)
//! - `cart` - Cart store with session snapshot and remote mirroring
//! - `geocoding` - Reverse geocoding with provider fallback
//! - `orders` - Order placement and the status lifecycle

pub mod access;
pub mod auth;
pub mod cart;
pub mod geocoding;
pub mod orders;
