//! Ahmed Mart Core - domain types and pure storefront logic.
//!
//! This crate provides the invariant-bearing pieces of the delivery storefront:
//! - geofencing and delivery-fee pricing
//! - the cart state machine mirrored to the remote cart table
//! - role admission and route-guard decisions
//! - order assembly math and the order status lifecycle
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. The `storefront` crate wires these into
//! repositories, sessions and routes.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, normalized emails, pincodes and status enums
//! - [`geo`] - Great-circle distance and the tiered delivery fee
//! - [`service_area`] - Circular geofences and serviceability checks
//! - [`cart`] - Cart lines, quantity bounds and derived totals
//! - [`access`] - Roles, registry validation and the route guard
//! - [`order`] - Order drafts, snapshots and order numbers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod cart;
pub mod geo;
pub mod order;
pub mod service_area;
pub mod types;

pub use types::*;
