//! Remote wishlist backend client.
//!
//! The backend keeps one wishlist per `(shop, customer)` pair and exposes two
//! plain `GET` endpoints, including for state-changing actions:
//!
//! ```text
//! GET /wishlist-update/get?shop=<shop>&customerId=<id>
//!     -> { "success": true, "wishlist": [123, 456] }
//! GET /wishlist-update?shop=<shop>&customerId=<id>&productId=<id>&action=add|remove
//!     -> body ignored
//! ```

use std::future::Future;
use std::time::Duration;

use sentia_core::{CustomerId, ProductId, WishlistAction};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::WishlistConfig;

/// Errors that can occur when talking to the wishlist backend.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status.
    #[error("Backend returned status {0}")]
    Status(u16),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configured backend URL cannot carry a path.
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

/// Access to the remote copy of a customer's wishlist.
pub trait RemoteWishlist: Send + Sync + 'static {
    /// Fetch every product ID stored remotely for the customer.
    fn fetch_all(
        &self,
        customer: &CustomerId,
    ) -> impl Future<Output = Result<Vec<ProductId>, RemoteError>> + Send;

    /// Apply a single add/remove action.
    fn apply(
        &self,
        customer: &CustomerId,
        product: ProductId,
        action: WishlistAction,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// `reqwest`-based client for the wishlist backend.
#[derive(Debug, Clone)]
pub struct HttpRemoteWishlist {
    client: reqwest::Client,
    base_url: Url,
    shop: String,
}

/// Body of the get-all endpoint.
#[derive(Debug, Deserialize)]
struct GetWishlistResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    wishlist: Option<serde_json::Value>,
}

impl HttpRemoteWishlist {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns error if the backend URL cannot be a base or the HTTP client
    /// fails to build.
    pub fn new(config: &WishlistConfig) -> Result<Self, RemoteError> {
        Self::with_timeout(
            config.backend_url.clone(),
            config.shop.clone(),
            config.request_timeout,
        )
    }

    /// Create a client from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` cannot be a base or the HTTP client fails
    /// to build.
    pub fn with_timeout(
        base_url: Url,
        shop: String,
        timeout: Duration,
    ) -> Result<Self, RemoteError> {
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            shop,
        })
    }

    /// Build `<base>/<segments...>?shop=..&customerId=..` plus extra pairs.
    fn endpoint(&self, segments: &[&str], customer: &CustomerId, extra: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("shop", &self.shop)
                .append_pair("customerId", customer.as_str());
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        url
    }

    /// URL of the get-all endpoint.
    #[must_use]
    pub fn fetch_url(&self, customer: &CustomerId) -> Url {
        self.endpoint(&["wishlist-update", "get"], customer, &[])
    }

    /// URL of the single-action endpoint.
    #[must_use]
    pub fn action_url(
        &self,
        customer: &CustomerId,
        product: ProductId,
        action: WishlistAction,
    ) -> Url {
        let product = product.to_string();
        self.endpoint(
            &["wishlist-update"],
            customer,
            &[("productId", product.as_str()), ("action", action.as_str())],
        )
    }
}

impl RemoteWishlist for HttpRemoteWishlist {
    #[instrument(skip(self), fields(customer = %customer))]
    async fn fetch_all(&self, customer: &CustomerId) -> Result<Vec<ProductId>, RemoteError> {
        let response = self.client.get(self.fetch_url(customer)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        let parsed: GetWishlistResponse = serde_json::from_str(&body)?;
        let ids = parse_wishlist(&parsed);
        debug!(count = ids.len(), success = parsed.success, "Fetched remote wishlist");
        Ok(ids)
    }

    #[instrument(skip(self), fields(customer = %customer, product_id = %product, action = %action))]
    async fn apply(
        &self,
        customer: &CustomerId,
        product: ProductId,
        action: WishlistAction,
    ) -> Result<(), RemoteError> {
        let response = self
            .client
            .get(self.action_url(customer, product, action))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }
        Ok(())
    }
}

/// Extract IDs from a get-all body.
///
/// Anything but `success: true` with an array yields no IDs. Entries may be
/// JSON numbers or numeric strings; anything else is skipped.
fn parse_wishlist(response: &GetWishlistResponse) -> Vec<ProductId> {
    if !response.success {
        return Vec::new();
    }
    let Some(serde_json::Value::Array(items)) = &response.wishlist else {
        return Vec::new();
    };
    items.iter().filter_map(parse_remote_id).collect()
}

fn parse_remote_id(value: &serde_json::Value) -> Option<ProductId> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(ProductId::new),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpRemoteWishlist {
        HttpRemoteWishlist::with_timeout(
            Url::parse(base).unwrap(),
            "sentia-dev.myshopify.com".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn customer() -> CustomerId {
        CustomerId::parse("6021").unwrap()
    }

    #[test]
    fn test_fetch_url() {
        let url = client("https://wishlist.example.com").fetch_url(&customer());
        assert_eq!(
            url.as_str(),
            "https://wishlist.example.com/wishlist-update/get?shop=sentia-dev.myshopify.com&customerId=6021"
        );
    }

    #[test]
    fn test_action_url_keeps_base_path() {
        let url = client("https://example.com/api/").action_url(
            &customer(),
            ProductId::new(42),
            WishlistAction::Remove,
        );
        assert_eq!(
            url.as_str(),
            "https://example.com/api/wishlist-update?shop=sentia-dev.myshopify.com&customerId=6021&productId=42&action=remove"
        );
    }

    #[test]
    fn test_rejects_non_base_url() {
        let result = HttpRemoteWishlist::with_timeout(
            Url::parse("mailto:someone@example.com").unwrap(),
            "shop".to_string(),
            Duration::from_secs(1),
        );
        assert!(matches!(result, Err(RemoteError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_wishlist_accepts_numbers_and_strings() {
        let body: GetWishlistResponse =
            serde_json::from_str(r#"{"success":true,"wishlist":[1,"2","x",null,3]}"#).unwrap();
        let ids = parse_wishlist(&body);
        assert_eq!(ids, vec![ProductId::new(1), ProductId::new(2), ProductId::new(3)]);
    }

    #[test]
    fn test_parse_wishlist_requires_success() {
        let body: GetWishlistResponse =
            serde_json::from_str(r#"{"success":false,"wishlist":[1]}"#).unwrap();
        assert!(parse_wishlist(&body).is_empty());
    }

    #[test]
    fn test_parse_wishlist_requires_array() {
        let body: GetWishlistResponse =
            serde_json::from_str(r#"{"success":true,"wishlist":"1,2"}"#).unwrap();
        assert!(parse_wishlist(&body).is_empty());

        let body: GetWishlistResponse = serde_json::from_str("{}").unwrap();
        assert!(parse_wishlist(&body).is_empty());
    }
}
