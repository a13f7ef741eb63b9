//! Integration tests for Sentia.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sentia-integration-tests
//! ```
//!
//! No external services are needed: [`FakeShopify`] serves the wishlist
//! backend and the storefront `/products.json` catalog from an in-process
//! axum server on an ephemeral port. Sessions use an in-memory `SQLite`
//! database unless a test points them at a file, and customer identities are
//! signed with [`PROXY_SECRET`] through [`signed_query`].
//!
//! # Test Categories
//!
//! - `remote_wishlist` - HTTP backend client
//! - `catalog` - catalog paging, locale prefix, caching and rendering
//! - `reconciliation` - login merge and lazy pull against the backend
//! - `storefront_http` - app-proxy routes end to end

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use secrecy::SecretString;
use sentia_storefront::config::StorefrontConfig;
use sentia_storefront::middleware::{AppProxyVerifier, connect_session_store};
use sentia_storefront::routes;
use sentia_storefront::state::AppState;
use serde_json::{Value, json};
use url::Url;

/// Shop domain the fake backend expects.
pub const SHOP: &str = "sentia-test.myshopify.com";

/// App secret the test storefront verifies app-proxy signatures with.
pub const PROXY_SECRET: &str = "sentia-test-proxy-secret";

/// One request received by the fake.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub query: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct FakeState {
    wishlists: HashMap<String, Vec<i64>>,
    requests: Vec<RecordedRequest>,
    catalog_size: usize,
    fail_get: bool,
    fail_actions: bool,
    action_delay: Option<Duration>,
}

/// In-process stand-in for the wishlist backend and the storefront catalog.
#[derive(Clone)]
pub struct FakeShopify {
    state: Arc<Mutex<FakeState>>,
    url: Url,
}

impl FakeShopify {
    /// Start the fake on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(FakeState::default()));

        let app = Router::new()
            .route("/wishlist-update/get", get(get_wishlist))
            .route("/wishlist-update", get(update_wishlist))
            .route("/products.json", get(products))
            .route("/{locale}/products.json", get(localized_products))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake shopify");
        let addr = listener.local_addr().expect("fake shopify address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            state,
            url: Url::parse(&format!("http://{addr}")).expect("fake shopify url"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake shopify state")
    }

    #[must_use]
    pub fn url(&self) -> Url {
        self.url.clone()
    }

    /// Serve `size` products with IDs `1..=size`.
    pub fn set_catalog_size(&self, size: usize) {
        self.lock().catalog_size = size;
    }

    pub fn set_wishlist(&self, customer: &str, ids: &[i64]) {
        self.lock().wishlists.insert(customer.to_string(), ids.to_vec());
    }

    /// Make the get-all endpoint answer 500.
    pub fn fail_get(&self, fail: bool) {
        self.lock().fail_get = fail;
    }

    /// Make the action endpoint answer 500.
    pub fn fail_actions(&self, fail: bool) {
        self.lock().fail_actions = fail;
    }

    /// Delay every action request by `delay` before it is applied.
    pub fn set_action_delay(&self, delay: Duration) {
        self.lock().action_delay = Some(delay);
    }

    /// Server-side wishlist of `customer`.
    #[must_use]
    pub fn wishlist(&self, customer: &str) -> Vec<i64> {
        self.lock().wishlists.get(customer).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// `(productId, action)` of every action request, in arrival order.
    #[must_use]
    pub fn actions(&self) -> Vec<(i64, String)> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == "/wishlist-update")
            .filter_map(|r| {
                let id = r.query.get("productId")?.parse().ok()?;
                Some((id, r.query.get("action")?.clone()))
            })
            .collect()
    }

    /// Number of catalog page requests so far.
    #[must_use]
    pub fn catalog_requests(&self) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.ends_with("/products.json"))
            .count()
    }

    /// Storefront configuration pointing both backends at this fake.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is rejected.
    #[must_use]
    pub fn storefront_config(&self, extra: &[(&str, &str)]) -> StorefrontConfig {
        let url = self.url.to_string();
        let mut vars: HashMap<String, String> = [
            ("STOREFRONT_BASE_URL", "http://localhost:3000"),
            ("WISHLIST_BACKEND_URL", url.as_str()),
            ("WISHLIST_CATALOG_ORIGIN", url.as_str()),
            ("WISHLIST_SHOP", SHOP),
            ("WISHLIST_REQUEST_TIMEOUT_SECS", "5"),
            ("WISHLIST_SYNC_LANE_IDLE_SECS", "1"),
            ("STOREFRONT_DATABASE_URL", "sqlite::memory:"),
            ("SHOPIFY_API_SECRET", PROXY_SECRET),
        ]
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
        for (k, v) in extra {
            vars.insert((*k).to_string(), (*v).to_string());
        }
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned()).expect("test configuration")
    }
}

// =============================================================================
// Fake Handlers
// =============================================================================

type Shared = Arc<Mutex<FakeState>>;

fn record<'a>(
    state: &'a Shared,
    path: &str,
    query: &HashMap<String, String>,
) -> MutexGuard<'a, FakeState> {
    let mut guard = state.lock().expect("fake shopify state");
    guard.requests.push(RecordedRequest {
        path: path.to_string(),
        query: query.clone(),
    });
    guard
}

async fn get_wishlist(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let guard = record(&state, "/wishlist-update/get", &query);
    if guard.fail_get {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let customer = query.get("customerId").cloned().unwrap_or_default();
    // IDs come back as strings, like the real backend
    let ids: Vec<String> = guard
        .wishlists
        .get(&customer)
        .map(|ids| ids.iter().map(ToString::to_string).collect())
        .unwrap_or_default();
    Json(json!({ "success": true, "wishlist": ids })).into_response()
}

async fn update_wishlist(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let delay = state.lock().expect("fake shopify state").action_delay;
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }

    let mut guard = record(&state, "/wishlist-update", &query);
    if guard.fail_actions {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    let (Some(customer), Some(Ok(product)), Some(action)) = (
        query.get("customerId"),
        query.get("productId").map(|p| p.parse::<i64>()),
        query.get("action"),
    ) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let list = guard.wishlists.entry(customer.clone()).or_default();
    match action.as_str() {
        "add" if !list.contains(&product) => list.push(product),
        "remove" => list.retain(|id| *id != product),
        _ => {}
    }
    Json(json!({ "success": true })).into_response()
}

async fn products(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    products_page(&state, "/products.json", &query)
}

async fn localized_products(
    State(state): State<Shared>,
    Path(locale): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    products_page(&state, &format!("/{locale}/products.json"), &query)
}

fn products_page(state: &Shared, path: &str, query: &HashMap<String, String>) -> Json<Value> {
    let guard = record(state, path, query);
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(30);
    let page: usize = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);

    let start = page.saturating_sub(1) * limit + 1;
    let end = (start + limit - 1).min(guard.catalog_size);
    let products: Vec<Value> = (start..=end)
        .map(|id| {
            json!({
                "id": id,
                "title": format!("Product {id}"),
                "handle": format!("product-{id}"),
                "images": [{ "src": format!("https://cdn.example.com/{id}.jpg") }],
                "variants": [{ "price": "19.99" }],
            })
        })
        .collect();
    Json(json!({ "products": products }))
}

// =============================================================================
// Helpers
// =============================================================================

/// App-proxy query string carrying a validly signed `customer`.
///
/// # Panics
///
/// Panics if the signing key is rejected.
#[must_use]
pub fn signed_query(customer: &str) -> String {
    AppProxyVerifier::new(SecretString::from(PROXY_SECRET))
        .signed_query(&[
            ("shop", SHOP),
            ("path_prefix", "/apps/sentia"),
            ("timestamp", "1317327555"),
            ("logged_in_customer_id", customer),
        ])
        .expect("proxy signature")
}

/// Serve the storefront app on an ephemeral port and return its base URL.
///
/// # Panics
///
/// Panics if the session database cannot be opened, the state cannot be
/// built or the listener cannot be bound.
pub async fn spawn_storefront(config: StorefrontConfig) -> String {
    let sessions = connect_session_store(&config)
        .await
        .expect("session database");
    let app = routes::app(AppState::new(config, sessions).expect("storefront state"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind storefront");
    let addr = listener.local_addr().expect("storefront address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{addr}")
}

/// Poll `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..40 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
