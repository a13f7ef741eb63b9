//! Wishlist commands against a file-backed local copy.
//!
//! The JSON file plays the part of a device's local storage, so the same
//! file can be driven through guest and logged-in flows.
//!
//! # Usage
//!
//! ```bash
//! sentia-cli wishlist add 7891234567890
//! sentia-cli wishlist --customer 8012345 sync
//! sentia-cli wishlist render > wishlist.html
//! ```
//!
//! # Environment Variables
//!
//! - `WISHLIST_BACKEND_URL` - Base URL of the remote wishlist backend
//! - `WISHLIST_SHOP` - Shopify store domain
//! - Optional `WISHLIST_*` settings as for the storefront service

use std::path::Path;

use sentia_core::{CustomerId, ProductId};
use sentia_storefront::config::{ConfigError, WishlistConfig};
use sentia_storefront::wishlist::{
    CatalogError, ControlRegistry, FileStorage, HttpCatalog, HttpRemoteWishlist, PullOutcome,
    ReconcileReport, RemoteError, SyncHandle, SyncOutcome, SyncQueue, WishlistStore,
    render_wishlist,
};
use thiserror::Error;

/// Store type used by every command.
pub type CliStore = WishlistStore<FileStorage, HttpRemoteWishlist>;

/// Errors that can occur during wishlist commands.
#[derive(Debug, Error)]
pub enum WishlistCommandError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend client could not be built.
    #[error("Wishlist backend error: {0}")]
    Remote(#[from] RemoteError),

    /// Catalog client could not be built.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Listing markup could not be rendered.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// The command needs a logged-in customer.
    #[error("This command requires --customer")]
    CustomerRequired,
}

/// Load the wishlist configuration from the environment (and `.env`).
///
/// # Errors
///
/// Returns `ConfigError` if required variables are missing or invalid.
pub fn load_config() -> Result<WishlistConfig, WishlistCommandError> {
    dotenvy::dotenv().ok();
    Ok(WishlistConfig::load(|key| std::env::var(key).ok())?)
}

/// Open the store backed by `path`.
///
/// # Errors
///
/// Returns error if the backend client cannot be built.
pub fn open_store(
    path: &Path,
    customer: Option<&str>,
    config: &WishlistConfig,
) -> Result<CliStore, WishlistCommandError> {
    let remote = HttpRemoteWishlist::new(config)?;
    let sync = SyncQueue::new(remote, config.sync_lane_idle);
    Ok(WishlistStore::new(
        FileStorage::new(path),
        config.storage_key.clone(),
        customer.and_then(CustomerId::parse),
        sync,
    ))
}

/// All wishlisted IDs, oldest first.
pub async fn list(store: &CliStore) -> Vec<ProductId> {
    store.get_all().await.to_vec()
}

/// Add a product to the local copy only.
pub async fn add(store: &CliStore, id: ProductId) -> bool {
    let added = store.add(id).await;
    if added {
        tracing::info!(product_id = %id, "Added to wishlist");
    } else {
        tracing::info!(product_id = %id, "Already in wishlist");
    }
    added
}

/// Remove a product and wait for its remote sync, if any.
pub async fn remove(store: &CliStore, id: ProductId) -> Option<SyncOutcome> {
    let handle = store.remove(id).await;
    tracing::info!(product_id = %id, "Removed from wishlist");
    wait(handle).await
}

/// Toggle a product and wait for its remote sync, if any.
///
/// Returns the new membership and the sync outcome.
pub async fn toggle(store: &CliStore, id: ProductId) -> (bool, Option<SyncOutcome>) {
    let outcome = store.toggle(id, None).await;
    tracing::info!(
        product_id = %id,
        now_active = outcome.now_active,
        "Toggled wishlist membership"
    );
    (outcome.now_active, wait(outcome.sync).await)
}

/// Run the login reconciliation.
///
/// # Errors
///
/// Returns `CustomerRequired` for guests.
pub async fn sync(store: &CliStore) -> Result<ReconcileReport, WishlistCommandError> {
    let report = store
        .full_sync_after_login()
        .await
        .ok_or(WishlistCommandError::CustomerRequired)?;

    if report.remote_fetch_failed {
        tracing::warn!("Server wishlist unavailable, pushed the local copy only");
    }
    tracing::info!(
        "Synchronized {} products ({} pushed, {} failed)",
        report.merged.len(),
        report.pushed,
        report.failed
    );
    Ok(report)
}

/// Adopt the server copy when the local copy is empty.
///
/// # Errors
///
/// Returns `CustomerRequired` for guests.
pub async fn pull(store: &CliStore) -> Result<PullOutcome, WishlistCommandError> {
    let outcome = store.load_server_wishlist_if_needed().await;
    match outcome {
        PullOutcome::Guest => return Err(WishlistCommandError::CustomerRequired),
        PullOutcome::LocalNotEmpty => tracing::info!("Local wishlist not empty, nothing pulled"),
        PullOutcome::Adopted(count) => tracing::info!("Pulled {count} products from the server"),
        PullOutcome::Unavailable => tracing::warn!("Server wishlist unavailable"),
    }
    Ok(outcome)
}

/// Render the listing container HTML.
///
/// # Errors
///
/// Returns error if the catalog client cannot be built or the template fails.
pub async fn render(
    store: &CliStore,
    config: &WishlistConfig,
) -> Result<String, WishlistCommandError> {
    let catalog = HttpCatalog::new(config)?;
    let options = config.render_options();
    let set = store.get_all().await;
    let rendered = render_wishlist(&set, &catalog, &options).await;

    let mut controls = ControlRegistry::new();
    rendered.notify(&mut [&mut controls]);
    controls.update_states(&set);
    tracing::info!(
        cards = rendered.cards().len(),
        controls = controls.len(),
        "Rendered wishlist"
    );

    Ok(rendered.to_html(&options)?)
}

async fn wait(handle: Option<SyncHandle>) -> Option<SyncOutcome> {
    let outcome = handle?.finished().await;
    if outcome == SyncOutcome::Failed {
        tracing::warn!("Remote sync failed; the local copy was still updated");
    }
    Some(outcome)
}
