//! Storefront product catalog access via `/products.json`.
//!
//! The listing view needs product data for every wishlisted ID, and the
//! public catalog endpoint only pages through everything. Pages are cached in
//! memory via `moka` (5 minute TTL by default).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sentia_core::ProductId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::WishlistConfig;

/// Products requested per catalog page.
pub const CATALOG_PAGE_SIZE: u32 = 50;

/// Locale served without a path prefix.
const DEFAULT_LOCALE: &str = "en";

/// Errors that can occur while reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Catalog endpoint answered with a non-success status.
    #[error("Catalog returned status {0}")]
    Status(u16),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configured origin cannot carry a path.
    #[error("Invalid catalog origin: {0}")]
    InvalidUrl(String),
}

/// A product as returned by `/products.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub images: Vec<CatalogImage>,
    #[serde(default)]
    pub variants: Vec<CatalogVariant>,
    /// Top-level price, present on some theme-specific payloads.
    #[serde(default)]
    pub price: Option<serde_json::Value>,
}

/// Product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogImage {
    pub src: String,
}

/// Product variant (only the price is used).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogVariant {
    #[serde(default)]
    pub price: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ProductsPage {
    #[serde(default)]
    products: Option<Vec<CatalogProduct>>,
}

/// A paged product catalog.
pub trait ProductCatalog: Send + Sync {
    /// Fetch one page (1-based). An empty page marks the end of the catalog.
    fn fetch_page(
        &self,
        page: u32,
    ) -> impl Future<Output = Result<Vec<CatalogProduct>, CatalogError>> + Send;
}

/// Fetch every product, page by page, until an empty page comes back.
///
/// # Errors
///
/// Returns the first page error; partial results are discarded.
#[instrument(skip(catalog))]
pub async fn fetch_all_products<C: ProductCatalog>(
    catalog: &C,
) -> Result<Vec<CatalogProduct>, CatalogError> {
    let mut products = Vec::new();
    let mut page = 1;

    loop {
        let batch = catalog.fetch_page(page).await?;
        debug!(page, batch_size = batch.len(), "Received catalog page");
        if batch.is_empty() {
            break;
        }
        products.extend(batch);
        page += 1;
    }

    Ok(products)
}

// =============================================================================
// HttpCatalog
// =============================================================================

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct PageKey {
    locale: Option<String>,
    page: u32,
}

/// `reqwest`-based catalog client with a shared page cache.
#[derive(Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    origin: Url,
    locale: Option<String>,
    cache: Option<Cache<PageKey, Arc<Vec<CatalogProduct>>>>,
}

impl HttpCatalog {
    /// Create a catalog client for the configured storefront.
    ///
    /// # Errors
    ///
    /// Returns error if the origin cannot be a base or the HTTP client fails
    /// to build.
    pub fn new(config: &WishlistConfig) -> Result<Self, CatalogError> {
        Self::with_options(
            config.catalog_origin.clone(),
            Some(config.locale.clone()),
            config.catalog_cache_ttl,
            config.request_timeout,
        )
    }

    /// Create a catalog client from explicit parts. A zero `cache_ttl`
    /// disables caching.
    ///
    /// # Errors
    ///
    /// Returns error if `origin` cannot be a base or the HTTP client fails to
    /// build.
    pub fn with_options(
        origin: Url,
        locale: Option<String>,
        cache_ttl: Duration,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        if origin.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(origin.to_string()));
        }

        let cache = (!cache_ttl.is_zero()).then(|| {
            Cache::builder()
                .max_capacity(200)
                .time_to_live(cache_ttl)
                .build()
        });

        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            origin,
            locale: normalize_locale(locale),
            cache,
        })
    }

    /// A client for another locale sharing this client's connection pool
    /// and cache.
    #[must_use]
    pub fn for_locale(&self, locale: Option<String>) -> Self {
        Self {
            locale: normalize_locale(locale),
            ..self.clone()
        }
    }

    /// URL of one catalog page.
    #[must_use]
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.origin.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            if let Some(locale) = &self.locale {
                path.push(locale);
            }
            path.push("products.json");
        }
        url.query_pairs_mut()
            .append_pair("limit", &CATALOG_PAGE_SIZE.to_string())
            .append_pair("page", &page.to_string());
        url
    }

    async fn request_page(&self, page: u32) -> Result<Vec<CatalogProduct>, CatalogError> {
        let response = self.client.get(self.page_url(page)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        let parsed: ProductsPage = serde_json::from_str(&body)?;
        Ok(parsed.products.unwrap_or_default())
    }
}

impl ProductCatalog for HttpCatalog {
    async fn fetch_page(&self, page: u32) -> Result<Vec<CatalogProduct>, CatalogError> {
        let Some(cache) = &self.cache else {
            return self.request_page(page).await;
        };

        let key = PageKey {
            locale: self.locale.clone(),
            page,
        };
        if let Some(cached) = cache.get(&key).await {
            debug!(page, "Catalog page cache hit");
            return Ok(cached.as_ref().clone());
        }

        let products = self.request_page(page).await?;
        cache.insert(key, Arc::new(products.clone())).await;
        Ok(products)
    }
}

/// The default locale and blank values mean "no prefix".
fn normalize_locale(locale: Option<String>) -> Option<String> {
    locale
        .map(|l| l.trim().to_owned())
        .filter(|l| !l.is_empty() && l != DEFAULT_LOCALE)
}
