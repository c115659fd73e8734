//! Integration tests for Jouwwinkel.
//!
//! The HTTP tests talk to running servers; the stock tests call the order
//! services directly against a migrated database. All are `#[ignore]`d by
//! default.
//!
//! # Running Tests
//!
//! ```bash
//! jw-cli migrate all
//! jw-cli seed catalog crates/cli/seed/catalog.yaml
//! jw-cli admin create -e test@jouwwinkel.nl -n Test -r admin --password 'integration-secret'
//!
//! cargo run -p jouwwinkel-storefront &
//! cargo run -p jouwwinkel-admin &
//!
//! ADMIN_TEST_EMAIL=test@jouwwinkel.nl ADMIN_TEST_PASSWORD=integration-secret \
//!     cargo test -p jouwwinkel-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - default `http://localhost:3000`
//! - `ADMIN_BASE_URL` - default `http://localhost:3001`
//! - `ADMIN_TEST_EMAIL` / `ADMIN_TEST_PASSWORD` - an account with the `admin` role
//! - `DATABASE_URL` - the migrated database, for the stock tests

use reqwest::Client;
use reqwest::redirect::Policy;
use sqlx::PgPool;

/// Pool on the test database.
///
/// # Panics
///
/// Panics when `DATABASE_URL` is unset or the database is unreachable.
pub async fn database() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL not set");
    PgPool::connect(&url).await.expect("Failed to connect to DATABASE_URL")
}

/// Base URL of the storefront under test.
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Base URL of the back-office under test.
#[must_use]
pub fn admin_base_url() -> String {
    std::env::var("ADMIN_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_owned())
}

/// Client with its own cookie jar that does not follow redirects, so tests
/// can assert on `303 See Other` and its `Location`.
///
/// # Panics
///
/// Panics if the TLS backend cannot be initialized.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Credentials of the test admin account.
///
/// # Panics
///
/// Panics when `ADMIN_TEST_EMAIL` or `ADMIN_TEST_PASSWORD` is unset.
#[must_use]
pub fn admin_credentials() -> (String, String) {
    (
        std::env::var("ADMIN_TEST_EMAIL").expect("ADMIN_TEST_EMAIL not set"),
        std::env::var("ADMIN_TEST_PASSWORD").expect("ADMIN_TEST_PASSWORD not set"),
    )
}

/// `Location` header of a redirect, if any.
#[must_use]
pub fn location(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}
