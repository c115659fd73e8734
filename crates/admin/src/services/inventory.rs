//! Variant inventory generation and bulk editing.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use jouwwinkel_core::ProductId;
use jouwwinkel_core::variants::{InventoryPlan, VariantError, plan_inventory_sync};

use crate::db::combos::COMBO_COMPONENT_CONFLICT;
use crate::db::{RepositoryError, VariantUpdate, variants};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error(transparent)]
    Variants(#[from] VariantError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Bring a product's variant rows in line with its options.
///
/// The product row is locked for the whole run, so two admins pressing
/// "generate" at once end up with one set of variants.
///
/// # Errors
///
/// Returns `InventoryError::Variants` when the options would produce too
/// many combinations, and `RepositoryError::Conflict` when the product is
/// part of a combo; nothing is changed in either case.
#[instrument(skip(pool))]
pub async fn generate_inventory(pool: &PgPool, product_id: ProductId) -> Result<InventoryPlan, InventoryError> {
    let mut tx = pool.begin().await?;

    variants::lock_product(&mut tx, product_id).await?;
    let options = variants::options(&mut *tx, product_id).await?;
    let existing = variants::variants(&mut *tx, product_id).await?;

    let plan = plan_inventory_sync(&options, &existing)?;
    if plan.leaves_variants() && variants::is_combo_component(&mut tx, product_id).await? {
        return Err(RepositoryError::Conflict(COMBO_COMPONENT_CONFLICT.to_owned()).into());
    }
    if !plan.is_noop() {
        variants::apply_inventory_plan(&mut tx, product_id, &plan).await?;
    }

    tx.commit().await?;

    tracing::info!(
        product_id = %product_id,
        created = plan.create.len(),
        kept = plan.keep.len(),
        removed = plan.remove.len(),
        "Inventory generated"
    );
    Ok(plan)
}

/// Save stock, SKU and price override for several variants at once.
///
/// All or nothing: one duplicate SKU rolls back every row.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` for a duplicate SKU and
/// `RepositoryError::NotFound` for a variant of another product.
#[instrument(skip(pool, updates), fields(count = updates.len()))]
pub async fn save_variants(
    pool: &PgPool,
    product_id: ProductId,
    updates: &[VariantUpdate],
) -> Result<(), InventoryError> {
    let mut tx = pool.begin().await?;
    for update in updates {
        variants::update_variant(&mut tx, product_id, update).await?;
    }
    tx.commit().await?;

    tracing::info!(product_id = %product_id, count = updates.len(), "Variants saved");
    Ok(())
}
