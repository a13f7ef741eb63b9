//! Application state shared across handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::StorefrontConfig;
use crate::middleware::customer::AppProxyVerifier;
use crate::wishlist::{
    CatalogError, HttpCatalog, HttpRemoteWishlist, RemoteError, RenderOptions, SyncQueue,
};

/// Error building the shared wishlist clients.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("wishlist backend client: {0}")]
    Remote(#[from] RemoteError),
    #[error("catalog client: {0}")]
    Catalog(#[from] CatalogError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The sync queue is shared by
/// every request, so one customer's actions on a product stay ordered even
/// when they come from several browsers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    sessions: SqliteStore,
    proxy: AppProxyVerifier,
    sync: SyncQueue<HttpRemoteWishlist>,
    catalog: HttpCatalog,
    render_options: RenderOptions,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured backend or catalog URL cannot be
    /// used as a base, or an HTTP client fails to build.
    pub fn new(config: StorefrontConfig, sessions: SqliteStore) -> Result<Self, StateError> {
        let remote = HttpRemoteWishlist::new(&config.wishlist)?;
        let catalog = HttpCatalog::new(&config.wishlist)?;
        let sync = SyncQueue::new(remote, config.wishlist.sync_lane_idle);
        let render_options = config.wishlist.render_options();
        let proxy = AppProxyVerifier::new(config.app_proxy_secret.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                sessions,
                proxy,
                sync,
                catalog,
                render_options,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get the session store.
    #[must_use]
    pub fn sessions(&self) -> &SqliteStore {
        &self.inner.sessions
    }

    /// Get the app-proxy signature verifier.
    #[must_use]
    pub fn proxy(&self) -> &AppProxyVerifier {
        &self.inner.proxy
    }

    /// Get the shared sync queue.
    #[must_use]
    pub fn sync(&self) -> &SyncQueue<HttpRemoteWishlist> {
        &self.inner.sync
    }

    /// Get the product catalog client.
    #[must_use]
    pub fn catalog(&self) -> &HttpCatalog {
        &self.inner.catalog
    }

    /// Get the listing card presentation settings.
    #[must_use]
    pub fn render_options(&self) -> &RenderOptions {
        &self.inner.render_options
    }
}

impl FromRef<AppState> for AppProxyVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.proxy().clone()
    }
}
