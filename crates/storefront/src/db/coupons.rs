//! Coupon lookups.

use sqlx::{PgExecutor, PgPool};

use jouwwinkel_core::coupon::{Coupon, normalize_code};

use super::RepositoryError;

macro_rules! coupon_select {
    () => {
        "SELECT id, code, description, discount_type, value, min_order_amount, max_discount, \
         usage_limit, times_used, starts_at, expires_at, is_active, created_at FROM shop.coupon"
    };
}

/// Repository for coupon lookups outside a transaction.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find a coupon by code, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_code(&self, code: &str) -> Result<Option<Coupon>, RepositoryError> {
        by_code(self.pool, code).await
    }
}

/// Find a coupon by code on any executor.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn by_code<'e, E>(executor: E, code: &str) -> Result<Option<Coupon>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Coupon>(concat!(coupon_select!(), " WHERE code = $1"))
        .bind(normalize_code(code))
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

/// Lock a coupon row for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_by_code<'e, E>(executor: E, code: &str) -> Result<Option<Coupon>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Coupon>(concat!(
        coupon_select!(),
        " WHERE code = $1 FOR UPDATE"
    ))
    .bind(normalize_code(code))
    .fetch_optional(executor)
    .await?;
    Ok(row)
}

/// Count one more use, unless the usage limit is already reached.
///
/// Returns `false` when the limit blocked the update.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn record_use<'e, E>(executor: E, code: &str) -> Result<bool, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE shop.coupon SET times_used = times_used + 1 \
         WHERE code = $1 AND (usage_limit IS NULL OR times_used < usage_limit)",
    )
    .bind(normalize_code(code))
    .execute(executor)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Give back one use after an order is cancelled.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn release_use<'e, E>(executor: E, code: &str) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    sqlx::query("UPDATE shop.coupon SET times_used = GREATEST(times_used - 1, 0) WHERE code = $1")
        .bind(normalize_code(code))
        .execute(executor)
        .await?;
    Ok(())
}
