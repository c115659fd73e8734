//! Site content and the category menu, cached in memory.
//!
//! Both are read on nearly every page, so they are kept in a `moka` cache
//! for `CONTENT_CACHE_SECS`. Admin edits show up once the entry expires.

use std::sync::Arc;
use std::time::Duration;

use comrak::{Options, markdown_to_html};
use moka::future::Cache;
use sqlx::PgPool;

use jouwwinkel_core::models::{Category, UiConfig};

use crate::db::{CatalogRepository, ContentRepository, RepositoryError};

const UI_CONFIG_KEY: &str = "ui_config";
const MENU_KEY: &str = "category_menu";

#[derive(Clone)]
enum CacheValue {
    UiConfig(Arc<UiConfig>),
    Menu(Arc<Vec<Category>>),
}

/// Cached access to `UiConfig` and the active categories.
#[derive(Clone)]
pub struct ContentService {
    pool: PgPool,
    cache: Cache<&'static str, CacheValue>,
}

impl ContentService {
    #[must_use]
    pub fn new(pool: PgPool, ttl: Duration) -> Self {
        let cache = Cache::builder().max_capacity(16).time_to_live(ttl).build();
        Self { pool, cache }
    }

    /// Current site content, defaults when none has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if loading fails.
    pub async fn ui_config(&self) -> Result<Arc<UiConfig>, RepositoryError> {
        if let Some(CacheValue::UiConfig(config)) = self.cache.get(UI_CONFIG_KEY).await {
            return Ok(config);
        }

        let config = Arc::new(ContentRepository::new(&self.pool).load().await?);
        self.cache
            .insert(UI_CONFIG_KEY, CacheValue::UiConfig(Arc::clone(&config)))
            .await;
        Ok(config)
    }

    /// Active categories in menu order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(CacheValue::Menu(menu)) = self.cache.get(MENU_KEY).await {
            return Ok(menu);
        }

        let menu = Arc::new(CatalogRepository::new(&self.pool).active_categories().await?);
        self.cache
            .insert(MENU_KEY, CacheValue::Menu(Arc::clone(&menu)))
            .await;
        Ok(menu)
    }

    /// Drop everything cached.
    pub fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}

/// Render shop-owner Markdown to HTML. Raw HTML in the source is dropped.
#[must_use]
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.render.r#unsafe = false;

    markdown_to_html(content, &options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_markdown_basic() {
        let html = render_markdown("# Over ons\n\nWe sell **good** things.");
        assert!(html.contains("<h1>Over ons</h1>"));
        assert!(html.contains("<strong>good</strong>"));
    }

    #[test]
    fn test_render_markdown_strips_raw_html() {
        let html = render_markdown("Hello <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_markdown_tables_and_autolinks() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\nSee https://example.com");
        assert!(html.contains("<table>"));
        assert!(html.contains("<a href=\"https://example.com\">"));
    }
}
