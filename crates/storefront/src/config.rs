//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the service
//! - `WISHLIST_BACKEND_URL` - Base URL of the remote wishlist backend
//! - `WISHLIST_SHOP` - Shopify store domain (e.g., your-store.myshopify.com)
//! - `SHOPIFY_API_SECRET` - App secret signing app-proxy requests
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_DATABASE_URL` - `SQLite` session database; falls back to
//!   `DATABASE_URL` (default: `sqlite://sentia-sessions.db`)
//! - `WISHLIST_ROUTE_PREFIX` - Public path the app proxy mounts the service
//!   under, used in fragment links (e.g., `/apps/sentia`; default: none)
//! - `WISHLIST_STORAGE_KEY` - Local storage key (default: `wm_wishlist_ids`)
//! - `WISHLIST_CATALOG_ORIGIN` - Storefront origin serving `/products.json`
//!   (default: `https://<WISHLIST_SHOP>`)
//! - `WISHLIST_LOCALE` - Catalog locale; anything but `en` adds a path prefix
//!   (default: en)
//! - `WISHLIST_CURRENCY` - Currency for listing prices (default: USD)
//! - `WISHLIST_PLACEHOLDER_IMAGE` - Image for products without one
//! - `WISHLIST_CATALOG_CACHE_SECS` - Catalog page cache TTL, 0 disables (default: 300)
//! - `WISHLIST_REQUEST_TIMEOUT_SECS` - Outbound HTTP timeout (default: 10)
//! - `WISHLIST_SYNC_LANE_IDLE_SECS` - Idle time before a sync lane closes (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use sentia_core::CurrencyCode;
use thiserror::Error;
use url::Url;

use crate::wishlist::{DEFAULT_STORAGE_KEY, RenderOptions};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Default `SQLite` session database.
pub const DEFAULT_SESSION_DATABASE_URL: &str = "sqlite://sentia-sessions.db";

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// `SQLite` session database URL
    pub session_database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the service
    pub base_url: Url,
    /// Shopify app secret used to verify app-proxy signatures
    pub app_proxy_secret: SecretString,
    /// Wishlist backend, catalog and presentation settings
    pub wishlist: WishlistConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions sent to Sentry
    pub sentry_traces_sample_rate: f32,
}

/// Wishlist configuration.
#[derive(Debug, Clone)]
pub struct WishlistConfig {
    /// Base URL of the remote wishlist backend
    pub backend_url: Url,
    /// Shopify store domain sent with every backend request
    pub shop: String,
    /// Storage key of the local ID array
    pub storage_key: String,
    /// Origin serving `/products.json`
    pub catalog_origin: Url,
    /// Catalog locale (`en` means no prefix)
    pub locale: String,
    /// Currency for listing prices
    pub currency: CurrencyCode,
    /// Image for products without one
    pub placeholder_image: Option<String>,
    /// Catalog page cache TTL (zero disables the cache)
    pub catalog_cache_ttl: Duration,
    /// Timeout for outbound requests
    pub request_timeout: Duration,
    /// Idle time before a sync lane shuts down
    pub sync_lane_idle: Duration,
    /// Public path prefix of the wishlist routes (empty when served at `/`)
    pub route_prefix: String,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env
            .or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string()))?;
        let base_url = env.url("STOREFRONT_BASE_URL")?;
        let session_database_url = env
            .optional("STOREFRONT_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .unwrap_or_else(|| DEFAULT_SESSION_DATABASE_URL.to_string());

        Ok(Self {
            session_database_url: SecretString::from(session_database_url),
            host,
            port,
            base_url,
            app_proxy_secret: SecretString::from(env.required("SHOPIFY_API_SECRET")?),
            wishlist: WishlistConfig::from_env(&env)?,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: env.rate("SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: env.rate("SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the service is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.scheme() == "https"
    }
}

impl WishlistConfig {
    /// Load only the wishlist settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::from_env(&Env(&lookup))
    }

    /// Presentation settings for listing cards.
    #[must_use]
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            currency: self.currency,
            placeholder_image: self.placeholder_image.clone(),
            route_prefix: self.route_prefix.clone(),
        }
    }

    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let shop = env.required("WISHLIST_SHOP")?;
        let catalog_origin = match env.optional("WISHLIST_CATALOG_ORIGIN") {
            Some(_) => env.url("WISHLIST_CATALOG_ORIGIN")?,
            None => Url::parse(&format!("https://{shop}")).map_err(|e| {
                ConfigError::InvalidEnvVar("WISHLIST_SHOP".to_string(), e.to_string())
            })?,
        };
        let currency = env
            .or_default("WISHLIST_CURRENCY", "USD")
            .parse::<CurrencyCode>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("WISHLIST_CURRENCY".to_string(), e.to_string())
            })?;

        Ok(Self {
            backend_url: env.url("WISHLIST_BACKEND_URL")?,
            shop,
            storage_key: env.or_default("WISHLIST_STORAGE_KEY", DEFAULT_STORAGE_KEY),
            catalog_origin,
            locale: env.or_default("WISHLIST_LOCALE", "en"),
            currency,
            placeholder_image: env.optional("WISHLIST_PLACEHOLDER_IMAGE"),
            catalog_cache_ttl: env.seconds("WISHLIST_CATALOG_CACHE_SECS", 300)?,
            request_timeout: env.seconds("WISHLIST_REQUEST_TIMEOUT_SECS", 10)?,
            sync_lane_idle: env.seconds("WISHLIST_SYNC_LANE_IDLE_SECS", 30)?,
            route_prefix: env.path_prefix("WISHLIST_ROUTE_PREFIX")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with typed accessors.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get an optional variable; blank values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    /// Get a required absolute `http(s)` URL.
    fn url(&self, key: &str) -> Result<Url, ConfigError> {
        let raw = self.required(key)?;
        let url = Url::parse(&raw)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }
        Ok(url)
    }

    /// Get a duration given in whole seconds.
    fn seconds(&self, key: &str, default: u64) -> Result<Duration, ConfigError> {
        self.optional(key)
            .map_or(Ok(default), |v| v.trim().parse::<u64>())
            .map(Duration::from_secs)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Get an optional absolute path prefix without its trailing slash.
    fn path_prefix(&self, key: &str) -> Result<String, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(String::new());
        };
        let prefix = raw.trim().trim_end_matches('/');
        if !prefix.is_empty() && !prefix.starts_with('/') {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must start with '/' (got {prefix})"),
            ));
        }
        Ok(prefix.to_string())
    }

    /// Get a sampling rate in `[0, 1]`.
    fn rate(&self, key: &str, default: f32) -> Result<f32, ConfigError> {
        let rate = self
            .optional(key)
            .map_or(Ok(default), |v| v.trim().parse::<f32>())
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if (0.0..=1.0).contains(&rate) {
            Ok(rate)
        } else {
            Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                format!("must be between 0 and 1 (got {rate})"),
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("STOREFRONT_BASE_URL", "https://wishlist.sentia.test"),
        ("WISHLIST_BACKEND_URL", "https://wishlist-sentia.onrender.com"),
        ("WISHLIST_SHOP", "sentia-dev.myshopify.com"),
        ("SHOPIFY_API_SECRET", "shpss_test_secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = StorefrontConfig::from_lookup(lookup(REQUIRED)).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert!(config.is_secure());
        assert_eq!(config.wishlist.storage_key, "wm_wishlist_ids");
        assert_eq!(
            config.wishlist.catalog_origin.as_str(),
            "https://sentia-dev.myshopify.com/"
        );
        assert_eq!(config.wishlist.locale, "en");
        assert_eq!(config.wishlist.currency, CurrencyCode::USD);
        assert_eq!(config.wishlist.catalog_cache_ttl, Duration::from_secs(300));
        assert_eq!(config.wishlist.request_timeout, Duration::from_secs(10));
        assert_eq!(config.wishlist.sync_lane_idle, Duration::from_secs(30));
        assert!(config.wishlist.route_prefix.is_empty());
        assert_eq!(
            config.session_database_url.expose_secret(),
            DEFAULT_SESSION_DATABASE_URL
        );
        assert_eq!(config.app_proxy_secret.expose_secret(), "shpss_test_secret");
        assert!(config.sentry_dsn.is_none());
        assert!((config.sentry_sample_rate - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_proxy_secret() {
        let err = StorefrontConfig::from_lookup(lookup(&REQUIRED[..3])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "SHOPIFY_API_SECRET"));
    }

    #[test]
    fn test_database_url_fallback() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("DATABASE_URL", "sqlite:///var/lib/sentia/sessions.db"));
        let config = StorefrontConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.session_database_url.expose_secret(),
            "sqlite:///var/lib/sentia/sessions.db"
        );

        pairs.push(("STOREFRONT_DATABASE_URL", "sqlite::memory:"));
        let config = StorefrontConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.session_database_url.expose_secret(), "sqlite::memory:");
    }

    #[test]
    fn test_route_prefix() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WISHLIST_ROUTE_PREFIX", "/apps/sentia/"));
        let config = StorefrontConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.wishlist.route_prefix, "/apps/sentia");
        assert_eq!(config.wishlist.render_options().route_prefix, "/apps/sentia");

        pairs.pop();
        pairs.push(("WISHLIST_ROUTE_PREFIX", "apps/sentia"));
        assert!(StorefrontConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_missing_required() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(key, _)| *key != "WISHLIST_SHOP")
            .collect();
        let err = StorefrontConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "WISHLIST_SHOP"));
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WISHLIST_STORAGE_KEY", "  "));
        let config = StorefrontConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.wishlist.storage_key, "wm_wishlist_ids");
    }

    #[test]
    fn test_rejects_non_http_backend() {
        let mut pairs = REQUIRED.to_vec();
        pairs[1] = ("WISHLIST_BACKEND_URL", "ftp://example.com");
        let err = StorefrontConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "WISHLIST_BACKEND_URL"));
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("STOREFRONT_PORT", "http"));
        assert!(StorefrontConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("WISHLIST_CATALOG_ORIGIN", "http://localhost:9292"),
            ("WISHLIST_LOCALE", "uk"),
            ("WISHLIST_CURRENCY", "uah"),
            ("WISHLIST_CATALOG_CACHE_SECS", "0"),
            ("SENTRY_TRACES_SAMPLE_RATE", "0.25"),
        ]);
        let config = StorefrontConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.wishlist.catalog_origin.as_str(), "http://localhost:9292/");
        assert_eq!(config.wishlist.locale, "uk");
        assert_eq!(config.wishlist.currency, CurrencyCode::UAH);
        assert!(config.wishlist.catalog_cache_ttl.is_zero());
        assert_eq!(config.wishlist.render_options().currency, CurrencyCode::UAH);
        assert!((config.sentry_traces_sample_rate - 0.25).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rate_out_of_range() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SENTRY_SAMPLE_RATE", "1.5"));
        assert!(StorefrontConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn test_invalid_seconds() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WISHLIST_REQUEST_TIMEOUT_SECS", "-1"));
        let err = StorefrontConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "WISHLIST_REQUEST_TIMEOUT_SECS")
        );
    }
}
