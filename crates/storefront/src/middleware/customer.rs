//! Shopify app-proxy customer extractor.
//!
//! Shopify forwards app-proxy requests with a `logged_in_customer_id` query
//! parameter (the customer's ID when someone is logged in, empty otherwise)
//! and signs the whole query with the app secret. The parameter is the only
//! customer identity the wishlist sees, so it is trusted only when the
//! `signature` verifies.
//!
//! # Signature
//!
//! Every parameter except `signature` is rendered as `key=value` (repeated
//! keys join their values with `,`), sorted by key and concatenated without
//! a separator. The signature is the hex HMAC-SHA256 of that string.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sentia_core::CustomerId;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::set_sentry_user;

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the logged-in customer's ID.
pub const CUSTOMER_QUERY_PARAM: &str = "logged_in_customer_id";

/// Query parameter carrying the app-proxy signature.
pub const SIGNATURE_QUERY_PARAM: &str = "signature";

/// Verifies app-proxy query signatures.
#[derive(Clone)]
pub struct AppProxyVerifier {
    secret: Arc<SecretString>,
}

impl std::fmt::Debug for AppProxyVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppProxyVerifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl AppProxyVerifier {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret: Arc::new(secret),
        }
    }

    /// Compute the signature of `params`. Any `signature` pair is ignored.
    #[must_use]
    pub fn sign<K, V>(&self, params: &[(K, V)]) -> Option<String>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mac = self.mac(params)?;
        Some(hex::encode(mac.finalize().into_bytes()))
    }

    /// Build a signed query string from `params`.
    #[must_use]
    pub fn signed_query<K, V>(&self, params: &[(K, V)]) -> Option<String>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let signature = self.sign(params)?;
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in params {
            query.append_pair(key.as_ref(), value.as_ref());
        }
        query.append_pair(SIGNATURE_QUERY_PARAM, &signature);
        Some(query.finish())
    }

    /// Check the `signature` of a raw query string.
    ///
    /// A missing or malformed signature fails verification.
    #[must_use]
    pub fn verify(&self, raw_query: &str) -> bool {
        let params: Vec<(String, String)> = url::form_urlencoded::parse(raw_query.as_bytes())
            .into_owned()
            .collect();

        let Some(provided) = params
            .iter()
            .find(|(key, _)| key == SIGNATURE_QUERY_PARAM)
            .and_then(|(_, value)| hex::decode(value).ok())
        else {
            return false;
        };

        // Constant-time comparison
        self.mac(&params)
            .is_some_and(|mac| mac.verify_slice(&provided).is_ok())
    }

    fn mac<K, V>(&self, params: &[(K, V)]) -> Option<HmacSha256>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (key, value) in params {
            if key.as_ref() != SIGNATURE_QUERY_PARAM {
                grouped
                    .entry(key.as_ref())
                    .or_default()
                    .push(value.as_ref());
            }
        }
        let message: String = grouped
            .iter()
            .map(|(key, values)| format!("{key}={}", values.join(",")))
            .collect();

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes()).ok()?;
        mac.update(message.as_bytes());
        Some(mac)
    }
}

/// Extractor for the (optional) logged-in customer.
///
/// Never rejects: a missing, empty or unsigned customer ID means a guest.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalCustomer(customer): OptionalCustomer) -> impl IntoResponse {
///     match customer {
///         Some(id) => format!("Hello, customer {id}"),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct OptionalCustomer(pub Option<CustomerId>);

impl<S> FromRequestParts<S> for OptionalCustomer
where
    S: Send + Sync,
    AppProxyVerifier: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let raw_query = parts.uri.query().unwrap_or_default();

        let Some(customer) = url::form_urlencoded::parse(raw_query.as_bytes())
            .find(|(key, _)| key == CUSTOMER_QUERY_PARAM)
            .and_then(|(_, value)| CustomerId::parse(&value))
        else {
            return Ok(Self(None));
        };

        if !AppProxyVerifier::from_ref(state).verify(raw_query) {
            warn!(customer_id = %customer, "Unsigned app-proxy customer, treating as guest");
            return Ok(Self(None));
        }

        debug!(customer_id = %customer, "App-proxy signature verified");
        set_sentry_user(&customer);
        tracing::Span::current().record("customer_id", customer.as_str());

        Ok(Self(Some(customer)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn verifier() -> AppProxyVerifier {
        AppProxyVerifier::new(SecretString::from("hush"))
    }

    async fn extract(uri: &str) -> Option<CustomerId> {
        let (mut parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        let OptionalCustomer(customer) = OptionalCustomer::from_request_parts(&mut parts, &verifier())
            .await
            .unwrap();
        customer
    }

    fn signed(customer: &str) -> String {
        verifier()
            .signed_query(&[
                ("shop", "sentia.myshopify.com"),
                ("path_prefix", "/apps/sentia"),
                ("timestamp", "1317327555"),
                (CUSTOMER_QUERY_PARAM, customer),
            ])
            .unwrap()
    }

    #[test]
    fn test_signature_matches_shopify_reference() {
        // Example from Shopify's app-proxy documentation
        let verifier = AppProxyVerifier::new(SecretString::from("hush"));
        let signature = verifier
            .sign(&[
                ("extra", "1"),
                ("extra", "2"),
                ("shop", "shop-name.myshopify.com"),
                ("logged_in_customer_id", "1"),
                ("path_prefix", "/apps/awesome_reviews"),
                ("timestamp", "1317327555"),
            ])
            .unwrap();
        assert_eq!(
            signature,
            "4c68c8624d737112c91818c11017d24d334b524cb5c2b8ba08daa056f7395ddb"
        );
    }

    #[test]
    fn test_verify_ignores_parameter_order() {
        let query = signed("8012345");
        let mut pairs: Vec<&str> = query.split('&').collect();
        pairs.reverse();
        assert!(verifier().verify(&pairs.join("&")));
    }

    #[tokio::test]
    async fn test_signed_customer() {
        let customer = extract(&format!("/wishlist?{}", signed("8012345")))
            .await
            .unwrap();
        assert_eq!(customer.as_str(), "8012345");
    }

    #[tokio::test]
    async fn test_unsigned_customer_is_guest() {
        assert!(
            extract("/wishlist?shop=sentia.myshopify.com&logged_in_customer_id=8012345")
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_tampered_customer_is_guest() {
        let query = signed("8012345").replace("8012345", "8012346");
        assert!(extract(&format!("/wishlist?{query}")).await.is_none());
    }

    #[tokio::test]
    async fn test_foreign_secret_is_guest() {
        let forged = AppProxyVerifier::new(SecretString::from("guess"))
            .signed_query(&[(CUSTOMER_QUERY_PARAM, "8012345")])
            .unwrap();
        assert!(extract(&format!("/wishlist?{forged}")).await.is_none());
    }

    #[tokio::test]
    async fn test_guest_when_absent_or_empty() {
        assert!(extract("/wishlist").await.is_none());
        assert!(extract(&format!("/wishlist?{}", signed(""))).await.is_none());
        assert!(extract("/wishlist?logged_in_customer_id=%20%20").await.is_none());
    }
}
