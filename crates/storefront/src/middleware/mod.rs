//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `SQLite` store)
//!
//! The app-proxy customer is read per handler via [`OptionalCustomer`], which
//! checks the proxy signature with [`AppProxyVerifier`].

pub mod customer;
pub mod request_id;
pub mod session;

pub use customer::{AppProxyVerifier, OptionalCustomer};
pub use request_id::request_id_middleware;
pub use session::{connect_session_store, create_session_layer, spawn_expired_session_cleanup};
