//! Core types for Sentia.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod action;
pub mod customer;
pub mod id;
pub mod price;

pub use action::{ParseActionError, WishlistAction};
pub use customer::CustomerId;
pub use id::*;
pub use price::{CurrencyCode, ParseCurrencyError, Price};
