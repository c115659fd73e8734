//! Variant options and per-combination inventory rows.
//!
//! Options are edited one at a time; the variant rows are then brought in
//! line with `plan_inventory_sync` through [`apply_inventory_plan`].

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::instrument;

use jouwwinkel_core::models::{Variant, VariantOption};
use jouwwinkel_core::variants::InventoryPlan;
use jouwwinkel_core::{ProductId, VariantId, VariantOptionId};

use super::{RepositoryError, conflict_on_unique, not_found_on_foreign_key};

/// New stock, SKU and price for one variant row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantUpdate {
    pub id: VariantId,
    pub sku: Option<String>,
    pub price_override: Option<Decimal>,
    pub stock: i32,
}

/// Repository for a product's options and variants.
pub struct VariantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VariantRepository<'a> {
    /// Create a new variant repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Options of a product in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn options(&self, product_id: ProductId) -> Result<Vec<VariantOption>, RepositoryError> {
        options(self.pool, product_id).await
    }

    /// Variant rows of a product, ordered by their values.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, RepositoryError> {
        variants(self.pool, product_id).await
    }

    /// Add an option at the end of the list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product already has an option with this name.
    /// Returns `RepositoryError::NotFound` if the product does not exist.
    #[instrument(skip(self, values))]
    pub async fn add_option(
        &self,
        product_id: ProductId,
        name: &str,
        values: &[String],
    ) -> Result<VariantOption, RepositoryError> {
        let row = sqlx::query_as::<_, VariantOption>(
            r#"INSERT INTO shop.variant_option (product_id, name, "values", position)
               VALUES ($1, $2, $3, (SELECT COALESCE(MAX(position) + 1, 0)
                                    FROM shop.variant_option WHERE product_id = $1))
               RETURNING id, product_id, name, "values", position"#,
        )
        .bind(product_id)
        .bind(name)
        .bind(values)
        .fetch_one(self.pool)
        .await
        .map_err(|e| match conflict_on_unique(e, "this product already has an option with that name") {
            RepositoryError::Database(e) => not_found_on_foreign_key(e),
            other => other,
        })?;
        Ok(row)
    }

    /// Delete one option of a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the option does not belong to the product.
    pub async fn delete_option(
        &self,
        product_id: ProductId,
        option_id: VariantOptionId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.variant_option WHERE id = $1 AND product_id = $2")
            .bind(option_id)
            .bind(product_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Options of a product on any executor.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn options<'e, E>(executor: E, product_id: ProductId) -> Result<Vec<VariantOption>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, VariantOption>(
        r#"SELECT id, product_id, name, "values", position FROM shop.variant_option
           WHERE product_id = $1 ORDER BY position, id"#,
    )
    .bind(product_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Variant rows of a product on any executor.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn variants<'e, E>(executor: E, product_id: ProductId) -> Result<Vec<Variant>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, Variant>(
        "SELECT id, product_id, option_values, sku, price_override, stock FROM shop.variant \
         WHERE product_id = $1 ORDER BY option_values",
    )
    .bind(product_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

/// Lock the product row so two generators cannot interleave.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the product does not exist.
pub async fn lock_product(conn: &mut PgConnection, product_id: ProductId) -> Result<(), RepositoryError> {
    sqlx::query_scalar::<_, i32>("SELECT id FROM shop.product WHERE id = $1 FOR UPDATE")
        .bind(product_id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(())
}

/// Whether any combo lists the product as a component.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn is_combo_component(conn: &mut PgConnection, product_id: ProductId) -> Result<bool, RepositoryError> {
    let found: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM shop.combo_item WHERE product_id = $1)")
            .bind(product_id)
            .fetch_one(conn)
            .await?;
    Ok(found)
}

/// Delete stale rows and insert the missing combinations with zero stock.
///
/// Rows that are kept are not touched, so their stock, SKU and price
/// survive.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a statement fails.
#[instrument(skip(conn, plan), fields(create = plan.create.len(), remove = plan.remove.len()))]
pub async fn apply_inventory_plan(
    conn: &mut PgConnection,
    product_id: ProductId,
    plan: &InventoryPlan,
) -> Result<(), RepositoryError> {
    if !plan.remove.is_empty() {
        let ids: Vec<i32> = plan.remove.iter().map(VariantId::as_i32).collect();
        sqlx::query("DELETE FROM shop.variant WHERE product_id = $1 AND id = ANY($2)")
            .bind(product_id)
            .bind(&ids)
            .execute(&mut *conn)
            .await?;
    }

    for values in &plan.create {
        sqlx::query("INSERT INTO shop.variant (product_id, option_values, stock) VALUES ($1, $2, 0)")
            .bind(product_id)
            .bind(values)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Save stock, SKU and price for one variant of a product.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the SKU is used elsewhere.
/// Returns `RepositoryError::NotFound` if the variant is not this product's.
pub async fn update_variant(
    conn: &mut PgConnection,
    product_id: ProductId,
    update: &VariantUpdate,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE shop.variant SET sku = $3, price_override = $4, stock = $5 \
         WHERE id = $1 AND product_id = $2",
    )
    .bind(update.id)
    .bind(product_id)
    .bind(update.sku.as_deref())
    .bind(update.price_override)
    .bind(update.stock)
    .execute(conn)
    .await
    .map_err(|e| conflict_on_unique(e, "this SKU is already used by another variant"))?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
