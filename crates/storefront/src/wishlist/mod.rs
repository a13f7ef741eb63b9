//! Customer wishlist: a device-local product set mirrored to a remote backend.
//!
//! # Architecture
//!
//! - Local storage is the source of truth for the current browser/device
//!   ([`storage`]); every store operation re-reads it, nothing is cached
//! - The remote backend (keyed by shop + customer) is kept in step with
//!   fire-and-forget actions, serialized per customer and product by [`sync::SyncQueue`]
//! - On login, [`WishlistStore::full_sync_after_login`] unions the local and
//!   remote sets and re-publishes the union; callers that must not wait for
//!   the re-publish split it into [`WishlistStore::merge_after_login`] and
//!   [`LoginMerge::publish`]
//! - The listing view is rendered from the full `/products.json` catalog
//!   ([`catalog`], [`render`]) and drives the toggle controls ([`controls`])
//!
//! Every public store operation is best-effort: storage and network failures
//! are logged and never reach the caller.
//!
//! # Example
//!
//! ```rust,ignore
//! use sentia_storefront::wishlist::{MemoryStorage, WishlistStore};
//!
//! let store = WishlistStore::new(storage, "wm_wishlist_ids", customer, sync_queue);
//! store.init().await;
//!
//! let outcome = store.toggle(product_id, Some(&mut control)).await;
//! if outcome.rerender_listing {
//!     let rendered = render_wishlist(&store.get_all().await, &catalog, &options).await;
//! }
//! ```

pub mod catalog;
pub mod controls;
pub mod remote;
pub mod render;
pub mod set;
pub mod storage;
pub mod store;
pub mod sync;

pub use catalog::{CatalogError, CatalogProduct, HttpCatalog, ProductCatalog, fetch_all_products};
pub use controls::{ControlId, ControlRegistry, RenderListener, ToggleControl};
pub use remote::{HttpRemoteWishlist, RemoteError, RemoteWishlist};
pub use render::{RenderOptions, RenderedWishlist, WishlistCard, render_wishlist};
pub use set::WishlistSet;
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError, WishlistStorage};
pub use store::{LoginMerge, PullOutcome, ReconcileReport, ToggleOutcome, WishlistStore};
pub use sync::{SyncHandle, SyncOutcome, SyncQueue};

/// Default local storage key for the wishlist ID array.
pub const DEFAULT_STORAGE_KEY: &str = "wm_wishlist_ids";
