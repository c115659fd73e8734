//! Integration tests for the back-office.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database seeded with `crates/cli/seed/catalog.yaml`
//! - The admin server running (cargo run -p jouwwinkel-admin)
//! - `ADMIN_TEST_EMAIL` and `ADMIN_TEST_PASSWORD` for an `admin` account

use jouwwinkel_integration_tests::{admin_base_url, admin_credentials, client, location};
use reqwest::{Client, StatusCode};

/// Sign in with the test account and return the client holding the session.
async fn signed_in_client() -> Client {
    let client = client();
    let (email, password) = admin_credentials();

    let resp = client
        .post(format!("{}/auth/login", admin_base_url()))
        .form(&[("email", email.as_str()), ("password", password.as_str())])
        .send()
        .await
        .expect("Failed to sign in");

    assert_eq!(resp.status(), StatusCode::SEE_OTHER, "sign-in was refused");
    assert_eq!(location(&resp).as_deref(), Some("/"));
    client
}

// ============================================================================
// Health and access control
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", admin_base_url()))
        .send()
        .await
        .expect("Failed to call /health");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_pages_redirect_to_login() {
    let client = client();
    let base_url = admin_base_url();

    for path in ["/", "/orders", "/products", "/coupons", "/settings"] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Failed to get page");
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "GET {path}");
        assert_eq!(location(&resp).as_deref(), Some("/auth/login"), "GET {path}");
    }
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_login_page_and_bad_password() {
    let client = client();
    let base_url = admin_base_url();

    let resp = client
        .get(format!("{base_url}/auth/login"))
        .send()
        .await
        .expect("Failed to get login page");
    assert_eq!(resp.status(), StatusCode::OK);
    let csp = resp.headers()["content-security-policy"]
        .to_str()
        .expect("ascii header")
        .to_owned();
    assert!(!csp.contains("unsafe-inline"));

    let resp = client
        .post(format!("{base_url}/auth/login"))
        .form(&[("email", "nobody@example.com"), ("password", "not-the-password")])
        .send()
        .await
        .expect("Failed to post login");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.text().await.expect("body").contains("Invalid email or password"));
}

// ============================================================================
// Signed-in pages
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_signed_in_pages_render() {
    let client = signed_in_client().await;
    let base_url = admin_base_url();

    for path in [
        "/",
        "/orders",
        "/orders?status=pending",
        "/products",
        "/products/new",
        "/categories",
        "/combos",
        "/coupons",
        "/coupons/new",
        "/shipping",
        "/reviews",
        "/reviews?status=approved",
        "/customers",
        "/settings",
    ] {
        let resp = client
            .get(format!("{base_url}{path}"))
            .send()
            .await
            .expect("Failed to get page");
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
    }
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_seeded_coupon_listed() {
    let client = signed_in_client().await;

    let body = client
        .get(format!("{}/coupons", admin_base_url()))
        .send()
        .await
        .expect("Failed to get coupons")
        .text()
        .await
        .expect("body");

    assert!(body.contains("WELKOM10"));
    assert!(body.contains("10% off"));
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_invalid_coupon_rerenders_form() {
    let client = signed_in_client().await;

    let resp = client
        .post(format!("{}/coupons", admin_base_url()))
        .form(&[
            ("code", "HALF-OFF"),
            ("discount_type", "percentage"),
            ("value", "150"),
        ])
        .send()
        .await
        .expect("Failed to post coupon");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.expect("body").contains("A percentage cannot exceed 100"));
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_category_lifecycle() {
    let client = signed_in_client().await;
    let base_url = admin_base_url();
    let name = format!("Integratie {}", uuid::Uuid::new_v4().simple());

    let resp = client
        .post(format!("{base_url}/categories"))
        .form(&[("name", name.as_str()), ("sort_order", "99"), ("is_active", "on")])
        .send()
        .await
        .expect("Failed to create category");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = client
        .get(format!("{base_url}/categories"))
        .send()
        .await
        .expect("Failed to list categories")
        .text()
        .await
        .expect("body");
    assert!(body.contains(&name));
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_unknown_order_is_not_found() {
    let client = signed_in_client().await;

    let resp = client
        .get(format!("{}/orders/999999999", admin_base_url()))
        .send()
        .await
        .expect("Failed to get order");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running admin server and test admin credentials"]
async fn test_logout_ends_session() {
    let client = signed_in_client().await;
    let base_url = admin_base_url();

    let resp = client
        .post(format!("{base_url}/auth/logout"))
        .send()
        .await
        .expect("Failed to log out");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = client
        .get(format!("{base_url}/orders"))
        .send()
        .await
        .expect("Failed to get orders");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

// ============================================================================
// Media
// ============================================================================

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_media_rejects_unknown_names() {
    let client = client();
    let base_url = admin_base_url();

    for name in ["missing.png", "..%2F..%2Fetc%2Fpasswd", "not-a-uuid.jpg"] {
        let resp = client
            .get(format!("{base_url}/media/{name}"))
            .send()
            .await
            .expect("Failed to get media");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET /media/{name}");
    }
}
