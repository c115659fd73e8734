//! Review moderation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use jouwwinkel_core::{ProductId, ReviewId, ReviewStatus};

use super::RepositoryError;

/// A review with the product it is about.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub product_name: String,
    pub author_name: String,
    pub rating: i16,
    pub title: String,
    pub body: String,
    pub status: ReviewStatus,
    pub verified_purchase: bool,
    pub created_at: DateTime<Utc>,
}

/// Repository for review moderation.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Reviews with the given status, oldest first so the queue drains in order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, status: ReviewStatus) -> Result<Vec<ReviewRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT r.id, r.product_id, p.name AS product_name, r.author_name, r.rating, r.title, \
             r.body, r.status, r.verified_purchase, r.created_at \
             FROM shop.review r JOIN shop.product p ON p.id = r.product_id \
             WHERE r.status = $1 ORDER BY r.created_at, r.id LIMIT 200",
        )
        .bind(status)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Approve or reject a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn set_status(&self, id: ReviewId, status: ReviewStatus) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE shop.review SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn delete(&self, id: ReviewId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.review WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
