//! Category management.

use sqlx::PgPool;

use jouwwinkel_core::CategoryId;
use jouwwinkel_core::models::Category;

use super::{RepositoryError, conflict_on_unique};

macro_rules! category_columns {
    () => {
        "id, name, slug, description, image_url, sort_order, is_active, created_at, updated_at"
    };
}

/// A category with the number of products filed under it.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CategoryRow {
    #[sqlx(flatten)]
    pub category: Category,
    pub product_count: i64,
}

/// Editable category fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
}

/// Repository for categories.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories in menu order, with product counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<CategoryRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT c.id, c.name, c.slug, c.description, c.image_url, c.sort_order, c.is_active, \
             c.created_at, c.updated_at, \
             (SELECT COUNT(*) FROM shop.product p WHERE p.category_id = c.id) AS product_count \
             FROM shop.category c ORDER BY c.sort_order, c.name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a category by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(concat!(
            "SELECT ",
            category_columns!(),
            " FROM shop.category WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(concat!(
            "INSERT INTO shop.category (name, slug, description, image_url, sort_order, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            category_columns!()
        ))
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a category with this slug already exists"))?;
        Ok(row)
    }

    /// Update a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(&self, id: CategoryId, input: &CategoryInput) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, Category>(concat!(
            "UPDATE shop.category SET name = $2, slug = $3, description = $4, image_url = $5, \
             sort_order = $6, is_active = $7, updated_at = NOW() WHERE id = $1 RETURNING ",
            category_columns!()
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .bind(input.sort_order)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a category with this slug already exists"))?;
        row.ok_or(RepositoryError::NotFound)
    }

    /// Delete a category. Its products stay, without a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the category does not exist.
    pub async fn delete(&self, id: CategoryId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.category WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
