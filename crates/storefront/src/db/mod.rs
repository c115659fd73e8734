//! Database operations for the `shop` schema.
//!
//! ## Tables
//!
//! - `category`, `product`, `variant_option`, `variant` - Catalog
//! - `combo`, `combo_item` - Bundles sold at one price
//! - `coupon`, `shipping_partner` - Promotions and carriers
//! - `customer`, `customer_password`, `customer_credential` - Accounts and passkeys
//! - `customer_order`, `order_line` - Orders with snapshot titles and prices
//! - `review`, `wishlist_item` - Customer feedback and saved products
//! - `ui_config` - Site content (JSONB)
//! - `session` - Tower-sessions storage
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` row
//! types so the crates build without a live database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p jouwwinkel-cli -- migrate storefront
//! ```

pub mod catalog;
pub mod combos;
pub mod content;
pub mod coupons;
pub mod credentials;
pub mod customers;
pub mod orders;
pub mod reviews;
pub mod wishlist;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use catalog::{CatalogRepository, ProductPage, ProductQuery, ProductSort};
pub use combos::ComboRepository;
pub use content::ContentRepository;
pub use coupons::CouponRepository;
pub use credentials::CredentialRepository;
pub use customers::{CustomerRepository, ProfileUpdate};
pub use orders::OrderRepository;
pub use reviews::{NewReview, ReviewRepository};
pub use wishlist::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(what.to_owned());
    }
    RepositoryError::Database(e)
}

/// Map a foreign-key violation (a row that points nowhere) to
/// [`RepositoryError::NotFound`].
pub(crate) fn not_found_on_foreign_key(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_foreign_key_violation()
    {
        return RepositoryError::NotFound;
    }
    RepositoryError::Database(e)
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
