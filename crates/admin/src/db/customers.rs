//! Customer lookups for the back-office.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use jouwwinkel_core::models::Customer;
use jouwwinkel_core::{CustomerId, Email};

use super::{PAGE_SIZE, RepositoryError, like_pattern, page_offset};

/// One line of the customer list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: CustomerId,
    pub email: Email,
    pub full_name: String,
    pub city: String,
    pub created_at: DateTime<Utc>,
    pub order_count: i64,
    /// Sum of non-cancelled order totals.
    pub total_spent: Decimal,
}

/// Repository for customer lookups.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of customers, newest first, plus the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: u32,
    ) -> Result<(Vec<CustomerRow>, i64), RepositoryError> {
        let pattern = search.map(like_pattern);

        let rows = sqlx::query_as::<_, CustomerRow>(
            "SELECT c.id, c.email, c.full_name, c.city, c.created_at, \
             COUNT(o.id) AS order_count, \
             COALESCE(SUM(o.total) FILTER (WHERE o.status <> 'cancelled'), 0) AS total_spent \
             FROM shop.customer c LEFT JOIN shop.customer_order o ON o.customer_id = c.id \
             WHERE ($1::TEXT IS NULL OR c.email ILIKE $1 OR c.full_name ILIKE $1) \
             GROUP BY c.id ORDER BY c.created_at DESC, c.id DESC LIMIT $2 OFFSET $3",
        )
        .bind(pattern.as_deref())
        .bind(PAGE_SIZE)
        .bind(page_offset(page))
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.customer c \
             WHERE ($1::TEXT IS NULL OR c.email ILIKE $1 OR c.full_name ILIKE $1)",
        )
        .bind(pattern.as_deref())
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, Customer>(
            "SELECT id, email, full_name, phone, street, postal_code, city, country, created_at, \
             updated_at FROM shop.customer WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }
}
