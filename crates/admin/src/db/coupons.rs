//! Coupon management.

use sqlx::PgPool;

use jouwwinkel_core::CouponId;
use jouwwinkel_core::coupon::{Coupon, CouponTerms};

use super::{RepositoryError, conflict_on_unique};

macro_rules! coupon_columns {
    () => {
        "id, code, description, discount_type, value, min_order_amount, max_discount, \
         usage_limit, times_used, starts_at, expires_at, is_active, created_at"
    };
}

/// A coupon as saved from the back-office form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponInput {
    pub terms: CouponTerms,
    pub description: String,
    pub is_active: bool,
}

/// Repository for coupons.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows = sqlx::query_as::<_, Coupon>(concat!(
            "SELECT ",
            coupon_columns!(),
            " FROM shop.coupon ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, Coupon>(concat!(
            "SELECT ",
            coupon_columns!(),
            " FROM shop.coupon WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create a coupon. The code must already be normalised.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        let t = &input.terms;
        let row = sqlx::query_as::<_, Coupon>(concat!(
            "INSERT INTO shop.coupon (code, description, discount_type, value, min_order_amount, \
             max_discount, usage_limit, starts_at, expires_at, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING ",
            coupon_columns!()
        ))
        .bind(&t.code)
        .bind(&input.description)
        .bind(t.discount_type)
        .bind(t.value)
        .bind(t.min_order_amount)
        .bind(t.max_discount)
        .bind(t.usage_limit)
        .bind(t.starts_at)
        .bind(t.expires_at)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a coupon with this code already exists"))?;
        Ok(row)
    }

    /// Update a coupon. The usage counter is left alone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn update(&self, id: CouponId, input: &CouponInput) -> Result<Coupon, RepositoryError> {
        let t = &input.terms;
        let row = sqlx::query_as::<_, Coupon>(concat!(
            "UPDATE shop.coupon SET code = $2, description = $3, discount_type = $4, value = $5, \
             min_order_amount = $6, max_discount = $7, usage_limit = $8, starts_at = $9, \
             expires_at = $10, is_active = $11 WHERE id = $1 RETURNING ",
            coupon_columns!()
        ))
        .bind(id)
        .bind(&t.code)
        .bind(&input.description)
        .bind(t.discount_type)
        .bind(t.value)
        .bind(t.min_order_amount)
        .bind(t.max_discount)
        .bind(t.usage_limit)
        .bind(t.starts_at)
        .bind(t.expires_at)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a coupon with this code already exists"))?;
        row.ok_or(RepositoryError::NotFound)
    }

    /// Flip the active flag; returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn toggle_active(&self, id: CouponId) -> Result<bool, RepositoryError> {
        sqlx::query_scalar(
            "UPDATE shop.coupon SET is_active = NOT is_active WHERE id = $1 RETURNING is_active",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a coupon. Orders keep the code they were placed with.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.coupon WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Give back one use after an order is cancelled.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn release_use(conn: &mut sqlx::PgConnection, code: &str) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.coupon SET times_used = GREATEST(times_used - 1, 0) WHERE code = $1")
        .bind(code)
        .execute(conn)
        .await?;
    Ok(())
}
