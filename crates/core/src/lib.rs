//! Sentia Core - Shared types library.
//!
//! This crate provides common types used across all Sentia components:
//! - `storefront` - Wishlist service and app-proxy routes
//! - `cli` - Command-line access to a device-local wishlist
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product and customer IDs, prices, and
//!   wishlist actions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
