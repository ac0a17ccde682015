//! Ahmed Mart storefront library.
//!
//! The HTTP surface of the delivery storefront: cart sync, service-area
//! checks, role-gated sign-in, addresses and the order lifecycle. Exposed as
//! a library so the binary and tests share one router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
