//! Figures for the dashboard.

use sqlx::PgPool;

use jouwwinkel_core::{OrderStatus, ProductId};
use rust_decimal::Decimal;

use super::RepositoryError;
use super::orders::OrderRow;

/// Number of orders in one status.
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// A product or variant at or below the low-stock threshold.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LowStockItem {
    pub product_id: ProductId,
    pub product_name: String,
    /// Set for variant rows, e.g. `M / Red`.
    pub variant_label: Option<String>,
    pub sku: Option<String>,
    pub stock: i32,
}

/// Repository for dashboard aggregates.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    /// Create a new dashboard repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Order count per status (statuses without orders are absent).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn status_counts(&self) -> Result<Vec<StatusCount>, RepositoryError> {
        let rows = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) AS count FROM shop.customer_order GROUP BY status",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Total of paid orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn paid_revenue(&self) -> Result<Decimal, RepositoryError> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total), 0) FROM shop.customer_order WHERE payment_status = 'paid'",
        )
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }

    /// Number of products on sale.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_products(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.product WHERE is_active")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Reviews waiting for moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_reviews(&self) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM shop.review WHERE status = 'pending'")
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Active stock-keeping rows at or below `threshold`, lowest first.
    ///
    /// Products with variants are judged by their variants only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<LowStockItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, LowStockItem>(
            "SELECT p.id AS product_id, p.name AS product_name, NULL::TEXT AS variant_label, \
                    NULL::TEXT AS sku, p.stock \
             FROM shop.product p \
             WHERE p.is_active AND p.stock <= $1 \
               AND NOT EXISTS (SELECT 1 FROM shop.variant v WHERE v.product_id = p.id) \
             UNION ALL \
             SELECT p.id, p.name, array_to_string(v.option_values, ' / '), v.sku, v.stock \
             FROM shop.variant v JOIN shop.product p ON p.id = v.product_id \
             WHERE p.is_active AND v.stock <= $1 \
             ORDER BY stock, product_name LIMIT 20",
        )
        .bind(threshold)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// The most recent orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<OrderRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT o.id, o.customer_id, o.email, o.full_name, o.status, o.payment_method, \
             o.payment_status, o.total, o.created_at, \
             (SELECT COALESCE(SUM(l.quantity), 0)::BIGINT FROM shop.order_line l \
              WHERE l.order_id = o.id) AS item_count \
             FROM shop.customer_order o ORDER BY o.created_at DESC, o.id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
