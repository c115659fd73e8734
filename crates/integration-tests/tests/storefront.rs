//! Integration tests for the storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database seeded with `crates/cli/seed/catalog.yaml`
//! - The storefront running (cargo run -p jouwwinkel-storefront)

use jouwwinkel_integration_tests::{client, location, storefront_base_url};
use reqwest::StatusCode;

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health_and_readiness() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/health"))
        .send()
        .await
        .expect("Failed to call /health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.expect("body"), "ok");

    let resp = client
        .get(format!("{base_url}/health/ready"))
        .send()
        .await
        .expect("Failed to call /health/ready");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_security_headers_present() {
    let resp = client()
        .get(format!("{}/", storefront_base_url()))
        .send()
        .await
        .expect("Failed to get home page");

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key("x-request-id"));
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server with the demo catalog"]
async fn test_catalog_pages() {
    let client = client();
    let base_url = storefront_base_url();

    for path in ["/products", "/categories", "/categories/koffie", "/combos", "/about"] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Failed to get catalog page");
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    }

    let body = client
        .get(format!("{base_url}/products/espresso-blend"))
        .send()
        .await
        .expect("Failed to get product")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Espresso Blend"));
    assert!(body.contains("Gewicht"));

    let body = client
        .get(format!("{base_url}/combos/filter-starterspakket"))
        .send()
        .await
        .expect("Failed to get combo")
        .text()
        .await
        .expect("body");
    assert!(body.contains("Handfilter V60"));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_product_is_not_found() {
    let resp = client()
        .get(format!("{}/products/does-not-exist-{}", storefront_base_url(), uuid::Uuid::new_v4()))
        .send()
        .await
        .expect("Failed to get product");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server with the demo catalog"]
async fn test_search_and_suggest() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/search?q=thee"))
        .send()
        .await
        .expect("Failed to search");
    assert_eq!(resp.status(), StatusCode::OK);
    // hits depend on the last index rebuild; the query is always echoed
    let body = resp.text().await.expect("body");
    assert!(body.contains("thee"));

    let resp = client
        .get(format!("{base_url}/search/suggest?q=espr"))
        .header("HX-Request", "true")
        .send()
        .await
        .expect("Failed to get suggestions");
    assert_eq!(resp.status(), StatusCode::OK);
}

// ============================================================================
// Cart and checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_new_visitor_has_empty_cart() {
    let client = client();
    let base_url = storefront_base_url();

    let body = client
        .get(format!("{base_url}/cart/count"))
        .send()
        .await
        .expect("Failed to get cart count")
        .text()
        .await
        .expect("body");
    assert!(body.contains("cart-count"));
    assert!(!body.contains("badge"));

    let resp = client
        .get(format!("{base_url}/cart"))
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_add_unknown_product_is_refused() {
    let resp = client()
        .post(format!("{}/cart/add", storefront_base_url()))
        .header("HX-Request", "true")
        .form(&[("product_id", "999999999")])
        .send()
        .await
        .expect("Failed to add to cart");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_add_without_item_is_bad_request() {
    let resp = client()
        .post(format!("{}/cart/add", storefront_base_url()))
        .form(&[("quantity", "2")])
        .send()
        .await
        .expect("Failed to add to cart");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_checkout_requires_login() {
    let client = client();
    let base_url = storefront_base_url();

    let resp = client
        .get(format!("{base_url}/checkout"))
        .send()
        .await
        .expect("Failed to get checkout");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).is_some_and(|l| l.starts_with("/auth/login")));

    let resp = client
        .get(format!("{base_url}/account/orders"))
        .send()
        .await
        .expect("Failed to get order history");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_then_account_page() {
    let client = client();
    let base_url = storefront_base_url();
    let email = format!("it-{}@example.com", uuid::Uuid::new_v4());

    let resp = client
        .post(format!("{base_url}/auth/register"))
        .form(&[
            ("email", email.as_str()),
            ("full_name", "Integratie Test"),
            ("password", "correct horse battery"),
            ("password_confirm", "correct horse battery"),
        ])
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .get(format!("{base_url}/account"))
        .send()
        .await
        .expect("Failed to get account");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.expect("body").contains(&email));
}
