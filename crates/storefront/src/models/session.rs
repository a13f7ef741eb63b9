//! Session-related types.
//!
//! The wishlist ID array itself lives in the session under the configured
//! storage key (see [`crate::wishlist::SessionStorage`]); the keys here hold
//! bookkeeping around it.

/// Session keys for wishlist bookkeeping.
pub mod keys {
    /// Customer ID the session's wishlist was last reconciled for.
    pub const WISHLIST_RECONCILED_FOR: &str = "wishlist_reconciled_for";
}
