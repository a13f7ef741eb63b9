//! Sentia Storefront library.
//!
//! Customer wishlist for the Sentia Shopify theme: the wishlist store and
//! its backends ([`wishlist`]), plus the app-proxy HTTP surface serving it
//! ([`routes`]). The `sentia-storefront` binary and `sentia-cli` are thin
//! wrappers around this crate.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod wishlist;
