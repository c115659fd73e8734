//! Site content stored in `shop.ui_config`.

use sqlx::PgPool;

use jouwwinkel_core::models::UiConfig;

use super::RepositoryError;

/// Key of the single site-wide document.
pub const SITE_KEY: &str = "site";

/// Repository for the site content document.
pub struct ContentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContentRepository<'a> {
    /// Create a new content repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the site content, or the defaults when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored JSON does not parse.
    pub async fn load(&self) -> Result<UiConfig, RepositoryError> {
        let value: Option<serde_json::Value> =
            sqlx::query_scalar("SELECT value FROM shop.ui_config WHERE key = $1")
                .bind(SITE_KEY)
                .fetch_optional(self.pool)
                .await?;

        value.map_or_else(
            || Ok(UiConfig::default()),
            |v| {
                serde_json::from_value(v).map_err(|e| {
                    RepositoryError::DataCorruption(format!("invalid ui_config document: {e}"))
                })
            },
        )
    }
}
