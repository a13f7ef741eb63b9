//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Wishlist (HTMX fragments, served through the Shopify app proxy)
//! GET  /wishlist               - Listing section
//! GET  /wishlist/items         - Listing container contents
//! POST /wishlist/toggle        - Toggle a product (button or listing fragment)
//! POST /wishlist/remove        - Remove a product (listing fragment)
//! GET  /wishlist/count         - Count badge (fragment)
//! GET  /wishlist/ids           - Wishlisted IDs (JSON)
//! ```

pub mod wishlist;

use axum::{
    Router,
    body::Body,
    http::Request,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/items", get(wishlist::items))
        .route("/toggle", post(wishlist::toggle))
        .route("/remove", post(wishlist::remove))
        .route("/count", get(wishlist::count))
        .route("/ids", get(wishlist::ids))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/wishlist", wishlist_routes())
}

/// Build the application with its session, request-ID and tracing layers.
///
/// Sentry layers are added by the binary.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.sessions().clone(), state.config());

    routes()
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = tracing::field::Empty,
                    customer_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the wishlist backend.
async fn health() -> &'static str {
    "ok"
}
