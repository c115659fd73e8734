//! Combo (bundle) queries.

use sqlx::{PgExecutor, PgPool};

use jouwwinkel_core::ComboId;
use jouwwinkel_core::models::{Combo, ComboItem};

use super::RepositoryError;

macro_rules! combo_select {
    () => {
        "SELECT id, name, slug, description, image_url, price, is_active, created_at, updated_at FROM shop.combo"
    };
}

/// Repository for combo pages.
pub struct ComboRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ComboRepository<'a> {
    /// Create a new combo repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Active combos, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_active(&self) -> Result<Vec<Combo>, RepositoryError> {
        let rows = sqlx::query_as::<_, Combo>(concat!(
            combo_select!(),
            " WHERE is_active ORDER BY created_at DESC"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get an active combo by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn by_slug(&self, slug: &str) -> Result<Option<Combo>, RepositoryError> {
        let row = sqlx::query_as::<_, Combo>(concat!(
            combo_select!(),
            " WHERE slug = $1 AND is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Component rows of one combo.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, combo_id: ComboId) -> Result<Vec<ComboItem>, RepositoryError> {
        items_for(self.pool, &[combo_id]).await
    }
}

/// Combos by ID, active or not.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn combos_by_ids<'e, E>(executor: E, ids: &[ComboId]) -> Result<Vec<Combo>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<i32> = ids.iter().map(ComboId::as_i32).collect();
    let rows = sqlx::query_as::<_, Combo>(concat!(combo_select!(), " WHERE id = ANY($1)"))
        .bind(raw)
        .fetch_all(executor)
        .await?;
    Ok(rows)
}

/// Component rows for several combos.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn items_for<'e, E>(executor: E, ids: &[ComboId]) -> Result<Vec<ComboItem>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let raw: Vec<i32> = ids.iter().map(ComboId::as_i32).collect();
    let rows = sqlx::query_as::<_, ComboItem>(
        "SELECT combo_id, product_id, quantity FROM shop.combo_item \
         WHERE combo_id = ANY($1) ORDER BY combo_id, product_id",
    )
    .bind(raw)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}
