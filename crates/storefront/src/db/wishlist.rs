//! Saved products per customer.

use std::collections::HashSet;

use sqlx::PgPool;

use jouwwinkel_core::models::Product;
use jouwwinkel_core::{CustomerId, ProductId};

use super::RepositoryError;

/// Repository for customer wishlists.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add the product if absent, remove it if present.
    ///
    /// Returns whether the product is on the wishlist afterwards.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn toggle(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let removed = sqlx::query(
            "DELETE FROM shop.wishlist_item WHERE customer_id = $1 AND product_id = $2",
        )
        .bind(customer_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if removed.rows_affected() > 0 {
            return Ok(false);
        }

        sqlx::query(
            "INSERT INTO shop.wishlist_item (customer_id, product_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(customer_id)
        .bind(product_id)
        .execute(self.pool)
        .await
        .map_err(super::not_found_on_foreign_key)?;
        Ok(true)
    }

    /// IDs of every saved product, for heart icons on listings.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_ids(
        &self,
        customer_id: CustomerId,
    ) -> Result<HashSet<ProductId>, RepositoryError> {
        let ids: Vec<i32> =
            sqlx::query_scalar("SELECT product_id FROM shop.wishlist_item WHERE customer_id = $1")
                .bind(customer_id)
                .fetch_all(self.pool)
                .await?;
        Ok(ids.into_iter().map(ProductId::new).collect())
    }

    /// Saved products that are still for sale, most recently saved first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn products(&self, customer_id: CustomerId) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(
            "SELECT p.id, p.category_id, p.name, p.slug, p.description, p.price, p.compare_at_price, \
             p.stock, p.image_urls, p.is_featured, p.is_active, p.created_at, p.updated_at \
             FROM shop.wishlist_item w JOIN shop.product p ON p.id = w.product_id \
             WHERE w.customer_id = $1 AND p.is_active ORDER BY w.created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
