//! Session middleware configuration.
//!
//! Sessions carry the per-browser wishlist copy and live in a `SQLite`
//! database through tower-sessions, so guest wishlists survive restarts.
//! Expired records are removed by a background task.

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::task::JoinHandle;
use tower_sessions::{ExpiredDeletion, Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sentia_session";

/// Session expiry time in seconds (30 days).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Maximum pooled connections to the session database.
const SESSION_POOL_SIZE: u32 = 5;

/// How often expired sessions are deleted.
const EXPIRED_DELETION_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Open the session database and create the sessions table if needed.
///
/// # Errors
///
/// Returns an error if the URL is invalid, the database cannot be opened or
/// the migration fails.
pub async fn connect_session_store(config: &StorefrontConfig) -> Result<SqliteStore, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(config.session_database_url.expose_secret())?
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(SESSION_POOL_SIZE)
        .connect_with(options)
        .await?;

    let store = SqliteStore::new(pool);
    store.migrate().await?;
    Ok(store)
}

/// Spawn the task deleting expired sessions.
pub fn spawn_expired_session_cleanup(store: SqliteStore) -> JoinHandle<()> {
    tokio::task::spawn(async move {
        if let Err(e) = store
            .continuously_delete_expired(EXPIRED_DELETION_INTERVAL)
            .await
        {
            tracing::error!(error = %e, "Expired session cleanup stopped");
        }
    })
}

/// Create the session layer over the `SQLite` store.
#[must_use]
pub fn create_session_layer(
    store: SqliteStore,
    config: &StorefrontConfig,
) -> SessionManagerLayer<SqliteStore> {
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
