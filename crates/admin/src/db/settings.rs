//! Site settings: the `UiConfig` document in `shop.ui_config`.

use sqlx::PgPool;

use jouwwinkel_core::models::UiConfig;

use super::RepositoryError;

/// Key of the single site-wide document.
pub const SITE_KEY: &str = "site";

/// Repository for site settings.
pub struct SettingsRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SettingsRepository<'a> {
    /// Create a new settings repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Load the site settings, or the defaults when nothing was saved yet.
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

    /// Replace the site settings.
    ///
    /// The storefront picks the change up when its content cache expires.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn save(&self, config: &UiConfig) -> Result<(), RepositoryError> {
        let value = serde_json::to_value(config)
            .map_err(|e| RepositoryError::DataCorruption(format!("cannot encode ui_config: {e}")))?;

        sqlx::query(
            "INSERT INTO shop.ui_config (key, value) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
        )
        .bind(SITE_KEY)
        .bind(value)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
