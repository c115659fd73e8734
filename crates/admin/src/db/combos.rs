//! Combo (bundle) management.

use rust_decimal::Decimal;
use sqlx::PgPool;

use jouwwinkel_core::models::Combo;
use jouwwinkel_core::{ComboId, ProductId};

use super::{RepositoryError, conflict_on_unique};

/// Refusal shared by combo editing and variant generation.
pub const COMBO_COMPONENT_CONFLICT: &str = "products with variants cannot be part of a combo";

macro_rules! combo_columns {
    () => {
        "id, name, slug, description, image_url, price, is_active, created_at, updated_at"
    };
}

/// A combo in the list, with its component count and their list value.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ComboRow {
    #[sqlx(flatten)]
    pub combo: Combo,
    pub item_count: i64,
    /// What the components cost when bought separately.
    pub regular_total: Decimal,
}

/// One component of a combo, joined with its product.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ComboItemRow {
    pub product_id: ProductId,
    pub product_name: String,
    pub price: Decimal,
    pub stock: i32,
    pub quantity: i32,
}

/// Editable combo fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboInput {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub is_active: bool,
}

/// Repository for combos and their components.
pub struct ComboRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ComboRepository<'a> {
    /// Create a new combo repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All combos, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<ComboRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComboRow>(
            "SELECT c.id, c.name, c.slug, c.description, c.image_url, c.price, c.is_active, \
             c.created_at, c.updated_at, \
             COUNT(ci.product_id) AS item_count, \
             COALESCE(SUM(p.price * ci.quantity), 0) AS regular_total \
             FROM shop.combo c \
             LEFT JOIN shop.combo_item ci ON ci.combo_id = c.id \
             LEFT JOIN shop.product p ON p.id = ci.product_id \
             GROUP BY c.id ORDER BY c.created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a combo by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ComboId) -> Result<Option<Combo>, RepositoryError> {
        let row = sqlx::query_as::<_, Combo>(concat!(
            "SELECT ",
            combo_columns!(),
            " FROM shop.combo WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Components of a combo with product details.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, id: ComboId) -> Result<Vec<ComboItemRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, ComboItemRow>(
            "SELECT ci.product_id, p.name AS product_name, p.price, p.stock, ci.quantity \
             FROM shop.combo_item ci JOIN shop.product p ON p.id = ci.product_id \
             WHERE ci.combo_id = $1 ORDER BY p.name",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Create a combo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn create(&self, input: &ComboInput) -> Result<Combo, RepositoryError> {
        let row = sqlx::query_as::<_, Combo>(concat!(
            "INSERT INTO shop.combo (name, slug, description, image_url, price, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            combo_columns!()
        ))
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.image_url.as_deref())
        .bind(input.price)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a combo with this slug already exists"))?;
        Ok(row)
    }

    /// Update a combo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the combo does not exist.
    /// Returns `RepositoryError::Conflict` if the slug is taken.
    pub async fn update(&self, id: ComboId, input: &ComboInput) -> Result<Combo, RepositoryError> {
        let row = sqlx::query_as::<_, Combo>(concat!(
            "UPDATE shop.combo SET name = $2, slug = $3, description = $4, image_url = $5, \
             price = $6, is_active = $7, updated_at = NOW() WHERE id = $1 RETURNING ",
            combo_columns!()
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.slug)
        .bind(&input.description)
        .bind(input.image_url.as_deref())
        .bind(input.price)
        .bind(input.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a combo with this slug already exists"))?;
        row.ok_or(RepositoryError::NotFound)
    }

    /// Delete a combo. Past order lines keep their snapshot title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the combo does not exist.
    pub async fn delete(&self, id: ComboId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.combo WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add a product to a combo, or change its quantity if already there.
    ///
    /// Products with variants are refused: a combo line has no way to say
    /// which variant it takes stock from.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product has variants.
    /// Returns `RepositoryError::NotFound` if the combo or product does not exist.
    pub async fn set_item(
        &self,
        id: ComboId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let has_variants: Option<bool> = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM shop.variant v WHERE v.product_id = p.id) \
             FROM shop.product p WHERE p.id = $1 FOR UPDATE",
        )
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;
        match has_variants {
            None => return Err(RepositoryError::NotFound),
            Some(true) => {
                return Err(RepositoryError::Conflict(COMBO_COMPONENT_CONFLICT.to_owned()));
            }
            Some(false) => {}
        }

        sqlx::query(
            "INSERT INTO shop.combo_item (combo_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (combo_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
        )
        .bind(id)
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *tx)
        .await
        .map_err(super::not_found_on_foreign_key)?;

        sqlx::query("UPDATE shop.combo SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a product from a combo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it was not a component.
    pub async fn remove_item(&self, id: ComboId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.combo_item WHERE combo_id = $1 AND product_id = $2")
            .bind(id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
