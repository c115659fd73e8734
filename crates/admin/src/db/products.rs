//! Product management: listing, editing and images.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use jouwwinkel_core::models::Product;
use jouwwinkel_core::{CategoryId, ProductId};

use super::{
    PAGE_SIZE, RepositoryError, conflict_on_unique, like_pattern, not_found_on_foreign_key,
    page_offset,
};

macro_rules! product_columns {
    () => {
        "id, category_id, name, slug, description, price, compare_at_price, stock, image_urls, \
         is_featured, is_active, created_at, updated_at"
    };
}

/// One line of the product list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub stock: i32,
    pub is_active: bool,
    pub is_featured: bool,
    pub category_name: Option<String>,
    pub variant_count: i64,
    /// Sum over variants; `None` for products without variants.
    pub variant_stock: Option<i64>,
}

impl ProductRow {
    /// Units on hand, counting variants when there are any.
    #[must_use]
    pub fn available(&self) -> i64 {
        self.variant_stock.unwrap_or_else(|| i64::from(self.stock))
    }
}

/// Filters for the product list.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category_id: Option<CategoryId>,
    pub page: u32,
}

/// Editable product fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductInput {
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    pub is_featured: bool,
    pub is_active: bool,
}

/// Repository for back-office product management.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of products plus the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &ProductFilter) -> Result<(Vec<ProductRow>, i64), RepositoryError> {
        let pattern = filter.search.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT p.id, p.name, p.slug, p.price, p.stock, p.is_active, p.is_featured, \
             c.name AS category_name, \
             (SELECT COUNT(*) FROM shop.variant v WHERE v.product_id = p.id) AS variant_count, \
             (SELECT SUM(v.stock)::BIGINT FROM shop.variant v WHERE v.product_id = p.id) AS variant_stock \
             FROM shop.product p LEFT JOIN shop.category c ON c.id = p.category_id \
             WHERE ($1::TEXT IS NULL OR p.name ILIKE $1 OR p.slug ILIKE $1) \
               AND ($2::INT IS NULL OR p.category_id = $2) \
             ORDER BY p.created_at DESC, p.id DESC LIMIT $3 OFFSET $4",
        )
        .bind(pattern.as_deref())
        .bind(filter.category_id)
        .bind(PAGE_SIZE)
        .bind(page_offset(filter.page))
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.product p \
             WHERE ($1::TEXT IS NULL OR p.name ILIKE $1 OR p.slug ILIKE $1) \
               AND ($2::INT IS NULL OR p.category_id = $2)",
        )
        .bind(pattern.as_deref())
        .bind(filter.category_id)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Every product, by name, for pickers (combo items).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM shop.product ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(concat!(
            "SELECT ",
            product_columns!(),
            " FROM shop.product WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create(&self, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(concat!(
            "INSERT INTO shop.product (category_id, name, slug, description, price, \
             compare_at_price, stock, is_featured, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING ",
            product_columns!()
        ))
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock)
        .bind(input.is_featured)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(map_write_error)?;
        Ok(row)
    }

    /// Update a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product (or category) does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: ProductId, input: &ProductInput) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(concat!(
            "UPDATE shop.product SET category_id = $2, name = $3, slug = $4, description = $5, \
             price = $6, compare_at_price = $7, stock = $8, is_featured = $9, is_active = $10, \
             updated_at = NOW() WHERE id = $1 RETURNING ",
            product_columns!()
        ))
        .bind(id)
        .bind(input.category_id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.price)
        .bind(input.compare_at_price)
        .bind(input.stock)
        .bind(input.is_featured)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(map_write_error)?;
        row.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product that no order refers to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an order line refers to it.
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let referenced: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM shop.order_line l \
                LEFT JOIN shop.variant v ON v.id = l.variant_id \
                WHERE l.product_id = $1 OR v.product_id = $1)",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if referenced {
            return Err(RepositoryError::Conflict(
                "this product appears in orders; deactivate it instead".to_owned(),
            ));
        }

        let result = sqlx::query("DELETE FROM shop.product WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Append an image URL.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    pub async fn add_image(&self, id: ProductId, url: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.product SET image_urls = array_append(image_urls, $2), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(url)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove an image URL. Returns whether the product had it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn remove_image(&self, id: ProductId, url: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.product SET image_urls = array_remove(image_urls, $2), updated_at = NOW() \
             WHERE id = $1 AND $2 = ANY(image_urls)",
        )
        .bind(id)
        .bind(url)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Whether anything else (another product, a category, a combo or the
    /// site hero) still shows this image.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn image_in_use(&self, url: &str) -> Result<bool, RepositoryError> {
        let used: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.product WHERE $1 = ANY(image_urls)) \
                 OR EXISTS (SELECT 1 FROM shop.category WHERE image_url = $1) \
                 OR EXISTS (SELECT 1 FROM shop.combo WHERE image_url = $1) \
                 OR EXISTS (SELECT 1 FROM shop.ui_config WHERE value->>'hero_image_url' = $1)",
        )
        .bind(url)
        .fetch_one(self.pool)
        .await?;
        Ok(used)
    }
}

fn map_write_error(e: sqlx::Error) -> RepositoryError {
    match conflict_on_unique(e, "a product with this slug already exists") {
        RepositoryError::Database(e) => not_found_on_foreign_key(e),
        other => other,
    }
}
