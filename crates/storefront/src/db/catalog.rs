//! Catalog queries: categories, products and variants.
//!
//! Page queries go through [`CatalogRepository`]. The lookups used while
//! pricing a cart are free functions generic over the executor so checkout
//! can run them inside its transaction.

use std::collections::{HashMap, HashSet};

use sqlx::{PgExecutor, PgPool};
use tracing::instrument;

use jouwwinkel_core::models::{Category, Product, Variant, VariantOption};
use jouwwinkel_core::{CategoryId, ProductId, VariantId};

use super::RepositoryError;

macro_rules! category_select {
    () => {
        "SELECT id, name, slug, description, image_url, sort_order, is_active, created_at, updated_at FROM shop.category"
    };
}

macro_rules! product_select {
    () => {
        "SELECT p.id, p.category_id, p.name, p.slug, p.description, p.price, p.compare_at_price, \
         p.stock, p.image_urls, p.is_featured, p.is_active, p.created_at, p.updated_at \
         FROM shop.product p"
    };
}

macro_rules! variant_select {
    () => {
        "SELECT id, product_id, option_values, sku, price_override, stock FROM shop.variant"
    };
}

/// Products shown per listing page.
pub const PRODUCTS_PER_PAGE: u32 = 24;

/// Sort orders offered on the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// Parse a query-string value; unknown values fall back to newest.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price_asc" => Self::PriceAsc,
            "price_desc" => Self::PriceDesc,
            "name" => Self::Name,
            _ => Self::Newest,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Newest => "newest",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::Name => "name",
        }
    }

    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "p.price ASC, p.id",
            Self::PriceDesc => "p.price DESC, p.id",
            Self::Name => "LOWER(p.name), p.id",
        }
    }
}

/// Listing filter and paging.
#[derive(Debug, Clone, Copy)]
pub struct ProductQuery {
    pub category_id: Option<CategoryId>,
    pub sort: ProductSort,
    /// 1-based.
    pub page: u32,
}

/// One page of active products.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total: i64,
    pub page: u32,
}

impl ProductPage {
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        let total = u32::try_from(self.total.max(0)).unwrap_or(u32::MAX);
        total.div_ceil(PRODUCTS_PER_PAGE).max(1)
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Repository for storefront catalog pages.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active categories in menu order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, Category>(concat!(
            category_select!(),
            " WHERE is_active ORDER BY sort_order, name"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get an active category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(concat!(
            category_select!(),
            " WHERE slug = $1 AND is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Get a category by ID, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn category_by_id(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(concat!(category_select!(), " WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Featured active products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn featured_products(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(concat!(
            product_select!(),
            " WHERE p.is_active AND p.is_featured ORDER BY p.created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One listing page of active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, query: ProductQuery) -> Result<ProductPage, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.product p \
             WHERE p.is_active AND ($1::INTEGER IS NULL OR p.category_id = $1)",
        )
        .bind(query.category_id)
        .fetch_one(self.pool)
        .await?;

        let page = query.page.max(1);
        let offset = i64::from(page - 1) * i64::from(PRODUCTS_PER_PAGE);
        let sql = format!(
            "{} WHERE p.is_active AND ($1::INTEGER IS NULL OR p.category_id = $1) \
             ORDER BY {} LIMIT $2 OFFSET $3",
            product_select!(),
            query.sort.order_by()
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(query.category_id)
            .bind(i64::from(PRODUCTS_PER_PAGE))
            .bind(offset)
            .fetch_all(self.pool)
            .await?;

        Ok(ProductPage {
            products,
            total,
            page,
        })
    }

    /// Get an active product by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, Product>(concat!(
            product_select!(),
            " WHERE p.slug = $1 AND p.is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Other active products from the same category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn related_products(
        &self,
        product: &Product,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        let Some(category_id) = product.category_id else {
            return Ok(Vec::new());
        };
        let rows = sqlx::query_as::<_, Product>(concat!(
            product_select!(),
            " WHERE p.is_active AND p.category_id = $1 AND p.id <> $2 \
             ORDER BY p.is_featured DESC, p.created_at DESC LIMIT $3"
        ))
        .bind(category_id)
        .bind(product.id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Every active product, for the search index.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_active_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, Product>(concat!(
            product_select!(),
            " WHERE p.is_active ORDER BY p.id"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Total variant stock per product, for products sold through variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant_stock_totals(&self) -> Result<HashMap<ProductId, i64>, RepositoryError> {
        let rows: Vec<(ProductId, i64)> = sqlx::query_as(
            "SELECT product_id, COALESCE(SUM(GREATEST(stock, 0)), 0)::BIGINT \
             FROM shop.variant GROUP BY product_id",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Total variant stock for the given products. Products without
    /// variants are absent from the map.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant_stock_for(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, i64>, RepositoryError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows: Vec<(ProductId, i64)> = sqlx::query_as(
            "SELECT product_id, COALESCE(SUM(GREATEST(stock, 0)), 0)::BIGINT \
             FROM shop.variant WHERE product_id = ANY($1) GROUP BY product_id",
        )
        .bind(raw_ids(ids))
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Variant options of a product in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variant_options(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantOption>, RepositoryError> {
        let rows = sqlx::query_as::<_, VariantOption>(
            r#"SELECT id, product_id, name, "values", position FROM shop.variant_option
               WHERE product_id = $1 ORDER BY position, id"#,
        )
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Variants of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, RepositoryError> {
        let rows = sqlx::query_as::<_, Variant>(concat!(
            variant_select!(),
            " WHERE product_id = $1 ORDER BY id"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}

// =============================================================================
// Executor-generic lookups (used inside the checkout transaction)
// =============================================================================

fn raw_ids<T: Copy + Into<i32>>(ids: &[T]) -> Vec<i32> {
    ids.iter().map(|id| (*id).into()).collect()
}

/// Products by ID, active or not. Missing IDs are skipped.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn products_by_ids<'e, E>(
    executor: E,
    ids: &[ProductId],
) -> Result<Vec<Product>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, Product>(concat!(product_select!(), " WHERE p.id = ANY($1)"))
        .bind(raw_ids(ids))
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

/// Variants by ID. Missing IDs are skipped.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn variants_by_ids<'e, E>(
    executor: E,
    ids: &[VariantId],
) -> Result<Vec<Variant>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, Variant>(concat!(variant_select!(), " WHERE id = ANY($1)"))
        .bind(raw_ids(ids))
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

/// Which of the given products are sold through variants.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn products_with_variants<'e, E>(
    executor: E,
    ids: &[ProductId],
) -> Result<HashSet<ProductId>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let rows: Vec<i32> = sqlx::query_scalar(
        "SELECT DISTINCT product_id FROM shop.variant WHERE product_id = ANY($1)",
    )
    .bind(raw_ids(ids))
    .fetch_all(executor)
    .await?;
    Ok(rows.into_iter().map(ProductId::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse_round_trip() {
        for sort in [
            ProductSort::Newest,
            ProductSort::PriceAsc,
            ProductSort::PriceDesc,
            ProductSort::Name,
        ] {
            assert_eq!(ProductSort::parse(sort.as_str()), sort);
        }
        assert_eq!(ProductSort::parse("cheapest"), ProductSort::Newest);
    }

    #[test]
    fn test_page_arithmetic() {
        let page = |total, page| ProductPage {
            products: Vec::new(),
            total,
            page,
        };
        assert_eq!(page(0, 1).total_pages(), 1);
        assert_eq!(page(24, 1).total_pages(), 1);
        assert_eq!(page(25, 1).total_pages(), 2);
        assert!(page(25, 1).has_next());
        assert!(!page(25, 2).has_next());
        assert!(page(25, 2).has_prev());
        assert!(!page(25, 1).has_prev());
    }

    #[test]
    fn test_raw_ids() {
        assert_eq!(raw_ids(&[ProductId::new(3), ProductId::new(9)]), vec![3, 9]);
    }
}
