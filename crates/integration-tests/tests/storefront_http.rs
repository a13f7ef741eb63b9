//! End-to-end tests of the app-proxy routes.
//!
//! The storefront runs on an ephemeral port with both backends pointed at
//! [`FakeShopify`]; a cookie-keeping `reqwest` client plays the browser.

use std::time::{Duration, Instant};

use sentia_integration_tests::{FakeShopify, eventually, signed_query, spawn_storefront};
use serde_json::Value;

const CUSTOMER: &str = "8012345";

fn browser() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("client")
}

async fn ids(client: &reqwest::Client, base: &str, customer: Option<&str>) -> Vec<i64> {
    let mut url = format!("{base}/wishlist/ids");
    if let Some(customer) = customer {
        url.push_str(&format!("?{}", signed_query(customer)));
    }
    let body: Value = client
        .get(url)
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    body["wishlist"]
        .as_array()
        .expect("array")
        .iter()
        .filter_map(Value::as_i64)
        .collect()
}

#[tokio::test]
async fn test_health() {
    let fake = FakeShopify::start().await;
    let base = spawn_storefront(fake.storefront_config(&[])).await;

    let body = reqwest::get(format!("{base}/health"))
        .await
        .expect("request")
        .text()
        .await
        .expect("body");
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn test_guest_wishlist_stays_local() {
    let fake = FakeShopify::start().await;
    let base = spawn_storefront(fake.storefront_config(&[])).await;
    let client = browser();

    let response = client
        .post(format!("{base}/wishlist/toggle"))
        .form(&[("product_id", "42")])
        .send()
        .await
        .expect("request");
    assert_eq!(response.headers()["hx-trigger"], "wishlist-updated");

    assert_eq!(ids(&client, &base, None).await, vec![42]);
    // Another browser has its own copy
    assert!(ids(&browser(), &base, None).await.is_empty());
    assert!(fake.actions().is_empty());
}

#[tokio::test]
async fn test_first_customer_request_reconciles_once() {
    let fake = FakeShopify::start().await;
    fake.set_wishlist(CUSTOMER, &[10, 11]);
    let base = spawn_storefront(fake.storefront_config(&[])).await;
    let client = browser();

    // Guest activity before logging in
    client
        .post(format!("{base}/wishlist/toggle"))
        .form(&[("product_id", "12")])
        .send()
        .await
        .expect("request");

    assert_eq!(ids(&client, &base, Some(CUSTOMER)).await, vec![12, 10, 11]);
    assert!(
        eventually(|| {
            let fake = fake.clone();
            async move { fake.actions().len() == 3 }
        })
        .await
    );
    let mut server = fake.wishlist(CUSTOMER);
    server.sort_unstable();
    assert_eq!(server, vec![10, 11, 12]);

    let requests = fake.requests().len();
    ids(&client, &base, Some(CUSTOMER)).await;
    assert_eq!(fake.requests().len(), requests);
}

#[tokio::test]
async fn test_customer_toggle_reaches_backend() {
    let fake = FakeShopify::start().await;
    let base = spawn_storefront(fake.storefront_config(&[])).await;
    let client = browser();

    let response = client
        .post(format!("{base}/wishlist/toggle?{}", signed_query(CUSTOMER)))
        .form(&[("product_id", "77"), ("control_id", "pdp-heart")])
        .send()
        .await
        .expect("request");
    let html = response.text().await.expect("body");
    assert!(html.contains("id=\"pdp-heart\""));

    assert!(
        eventually(|| {
            let fake = fake.clone();
            async move { fake.wishlist(CUSTOMER) == vec![77] }
        })
        .await
    );

    client
        .post(format!("{base}/wishlist/toggle?{}", signed_query(CUSTOMER)))
        .form(&[("product_id", "77")])
        .send()
        .await
        .expect("request");

    assert!(
        eventually(|| {
            let fake = fake.clone();
            async move { fake.wishlist(CUSTOMER).is_empty() }
        })
        .await
    );
}

#[tokio::test]
async fn test_listing_toggle_rerenders_cards() {
    let fake = FakeShopify::start().await;
    fake.set_catalog_size(120);
    let base = spawn_storefront(fake.storefront_config(&[("WISHLIST_CATALOG_CACHE_SECS", "0")]))
        .await;
    let client = browser();

    for id in ["5", "101"] {
        client
            .post(format!("{base}/wishlist/toggle"))
            .form(&[("product_id", id)])
            .send()
            .await
            .expect("request");
    }

    let page = client
        .get(format!("{base}/wishlist"))
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("body");
    assert_eq!(page.matches("class=\"item-mysaveditems__item\"").count(), 2);

    let listing = client
        .post(format!("{base}/wishlist/toggle"))
        .form(&[("product_id", "5"), ("listing", "true")])
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("body");
    assert_eq!(listing.matches("class=\"item-mysaveditems__item\"").count(), 1);
    assert!(listing.contains("data-id=\"101\""));
    assert!(!listing.contains("data-id=\"5\""));

    let count = client
        .get(format!("{base}/wishlist/count"))
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("body");
    assert!(count.contains("data-count=\"1\""));
}

#[tokio::test]
async fn test_unsigned_customer_is_served_as_guest() {
    let fake = FakeShopify::start().await;
    fake.set_wishlist("9000001", &[99, 100]);
    let base = spawn_storefront(fake.storefront_config(&[])).await;
    let client = browser();

    let ids_body: Value = client
        .get(format!("{base}/wishlist/ids?logged_in_customer_id=9000001"))
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json");
    assert_eq!(ids_body["wishlist"], Value::Array(Vec::new()));

    let forged = signed_query("9000001").replace("9000001", "9000002");
    client
        .post(format!("{base}/wishlist/toggle?{forged}"))
        .form(&[("product_id", "99")])
        .send()
        .await
        .expect("request");

    // The toggle stayed in the guest session
    assert_eq!(ids(&client, &base, None).await, vec![99]);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fake.wishlist("9000001"), vec![99, 100]);
    assert!(fake.wishlist("9000002").is_empty());
    assert!(fake.requests().is_empty());
}

#[tokio::test]
async fn test_first_customer_request_does_not_wait_for_publish() {
    let fake = FakeShopify::start().await;
    fake.set_action_delay(Duration::from_millis(250));
    let base = spawn_storefront(fake.storefront_config(&[])).await;
    let client = browser();

    for id in ["1", "2", "3", "4", "5"] {
        client
            .post(format!("{base}/wishlist/toggle"))
            .form(&[("product_id", id)])
            .send()
            .await
            .expect("request");
    }

    // Publishing five adds one at a time takes over a second
    let started = Instant::now();
    let merged = ids(&client, &base, Some(CUSTOMER)).await;
    assert!(started.elapsed() < Duration::from_millis(600));
    assert_eq!(merged, vec![1, 2, 3, 4, 5]);

    assert!(
        eventually(|| {
            let fake = fake.clone();
            async move { fake.wishlist(CUSTOMER) == vec![1, 2, 3, 4, 5] }
        })
        .await
    );
}

#[tokio::test]
async fn test_guest_session_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = format!("sqlite://{}", dir.path().join("sessions.db").display());
    let fake = FakeShopify::start().await;
    let config = fake.storefront_config(&[("STOREFRONT_DATABASE_URL", database_url.as_str())]);
    let client = browser();

    let first = spawn_storefront(config.clone()).await;
    client
        .post(format!("{first}/wishlist/toggle"))
        .form(&[("product_id", "42")])
        .send()
        .await
        .expect("request");

    let second = spawn_storefront(config).await;
    assert_eq!(ids(&client, &second, None).await, vec![42]);
}
