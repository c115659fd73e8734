//! Product reviews.

use sqlx::PgPool;

use jouwwinkel_core::models::{RatingSummary, Review};
use jouwwinkel_core::{CustomerId, ProductId};

use super::{RepositoryError, conflict_on_unique};

/// A review submitted by a signed-in customer.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: ProductId,
    pub customer_id: CustomerId,
    pub author_name: String,
    pub rating: i16,
    pub title: String,
    pub body: String,
    pub verified_purchase: bool,
}

/// Repository for product reviews.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Approved reviews of a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn approved_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let rows = sqlx::query_as::<_, Review>(
            "SELECT id, product_id, customer_id, author_name, rating, title, body, status, \
             verified_purchase, created_at FROM shop.review \
             WHERE product_id = $1 AND status = 'approved' ORDER BY created_at DESC",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Average and count over approved reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(&self, product_id: ProductId) -> Result<RatingSummary, RepositoryError> {
        let ratings: Vec<i16> = sqlx::query_scalar(
            "SELECT rating FROM shop.review WHERE product_id = $1 AND status = 'approved'",
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(RatingSummary::from_ratings(ratings))
    }

    /// Whether the customer already reviewed the product (any status).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_for_customer(
        &self,
        product_id: ProductId,
        customer_id: CustomerId,
    ) -> Result<bool, RepositoryError> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.review WHERE product_id = $1 AND customer_id = $2)",
        )
        .bind(product_id)
        .bind(customer_id)
        .fetch_one(self.pool)
        .await?;
        Ok(found)
    }

    /// Store a review for moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the customer already reviewed the product.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, review: &NewReview) -> Result<Review, RepositoryError> {
        let row = sqlx::query_as::<_, Review>(
            "INSERT INTO shop.review (product_id, customer_id, author_name, rating, title, body, \
             verified_purchase) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING id, product_id, customer_id, author_name, rating, title, body, status, \
             verified_purchase, created_at",
        )
        .bind(review.product_id)
        .bind(review.customer_id)
        .bind(&review.author_name)
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.body)
        .bind(review.verified_purchase)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "product already reviewed"))?;
        Ok(row)
    }
}
