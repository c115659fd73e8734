//! Database operations for the back-office.
//!
//! The back-office reads and writes the storefront's `shop` schema and owns
//! the `admin` schema:
//!
//! - `admin.admin_user` - Back-office accounts (Argon2 password hashes)
//! - `admin.session` - Tower-sessions storage
//!
//! Queries are built at runtime with `sqlx::query_as` and `FromRow` row
//! types so the crate builds without a live database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p jouwwinkel-cli -- migrate admin
//! ```

pub mod admin_users;
pub mod categories;
pub mod combos;
pub mod coupons;
pub mod customers;
pub mod dashboard;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod settings;
pub mod shipping;
pub mod variants;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use categories::{CategoryInput, CategoryRepository, CategoryRow};
pub use combos::{ComboInput, ComboItemRow, ComboRepository, ComboRow};
pub use coupons::{CouponInput, CouponRepository};
pub use customers::{CustomerRepository, CustomerRow};
pub use dashboard::{DashboardRepository, LowStockItem, StatusCount};
pub use orders::{OrderFilter, OrderRepository, OrderRow};
pub use products::{ProductFilter, ProductInput, ProductRepository, ProductRow};
pub use reviews::{ReviewRepository, ReviewRow};
pub use settings::SettingsRepository;
pub use shipping::{ShippingPartnerInput, ShippingPartnerRepository};
pub use variants::{VariantRepository, VariantUpdate};

/// Rows per page on list screens.
pub const PAGE_SIZE: i64 = 25;

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

    /// Constraint violation (e.g., duplicate slug).
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

/// 1-based page number to a SQL offset.
#[must_use]
pub fn page_offset(page: u32) -> i64 {
    (i64::from(page.max(1)) - 1) * PAGE_SIZE
}

/// Number of pages needed for `total` rows (at least one).
#[must_use]
pub fn page_count(total: i64) -> u32 {
    let pages = (total.max(1) + PAGE_SIZE - 1) / PAGE_SIZE;
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// `%term%` for `ILIKE`, with the wildcards in the term escaped.
#[must_use]
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging() {
        assert_eq!(page_offset(0), 0);
        assert_eq!(page_offset(1), 0);
        assert_eq!(page_offset(3), 2 * PAGE_SIZE);
        assert_eq!(page_count(0), 1);
        assert_eq!(page_count(PAGE_SIZE), 1);
        assert_eq!(page_count(PAGE_SIZE + 1), 2);
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" mok "), "%mok%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
