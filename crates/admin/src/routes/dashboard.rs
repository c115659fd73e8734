//! Dashboard route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::State;
use rust_decimal::Decimal;
use tracing::instrument;

use jouwwinkel_core::{OrderStatus, Price};

use crate::db::{DashboardRepository, LowStockItem, SettingsRepository, StatusCount};
use crate::error::AppError;
use crate::filters;
use crate::routes::context::PageContext;
use crate::routes::orders::OrderRowView;
use crate::state::AppState;

const RECENT_ORDERS: i64 = 8;

/// Order count for one status, zero included.
pub struct StatusTile {
    pub status: &'static str,
    pub label: &'static str,
    pub count: i64,
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub statuses: Vec<StatusTile>,
    pub revenue: String,
    pub active_products: i64,
    pub pending_reviews: i64,
    pub low_stock_threshold: i32,
    pub low_stock: Vec<LowStockItem>,
    /// Most recent first.
    pub orders: Vec<OrderRowView>,
}

/// One tile per status in lifecycle order, filling in zeros.
fn status_tiles(counts: &[StatusCount]) -> Vec<StatusTile> {
    OrderStatus::ALL
        .iter()
        .map(|&status| StatusTile {
            status: status.as_str(),
            label: status.label(),
            count: counts
                .iter()
                .find(|c| c.status == status)
                .map_or(0, |c| c.count),
        })
        .collect()
}

fn format_revenue(amount: Decimal) -> String {
    Price::eur(amount).to_string()
}

/// Dashboard page handler.
///
/// GET /
#[instrument(skip_all)]
pub async fn index(State(state): State<AppState>, ctx: PageContext) -> Result<DashboardTemplate, AppError> {
    let pool = state.pool();
    let settings = SettingsRepository::new(pool).load().await?;
    let repo = DashboardRepository::new(pool);

    let (counts, revenue, active_products, pending_reviews, low_stock, recent) = tokio::try_join!(
        repo.status_counts(),
        repo.paid_revenue(),
        repo.active_products(),
        repo.pending_reviews(),
        repo.low_stock(settings.low_stock_threshold),
        repo.recent_orders(RECENT_ORDERS),
    )?;

    Ok(DashboardTemplate {
        ctx,
        statuses: status_tiles(&counts),
        revenue: format_revenue(revenue),
        active_products,
        pending_reviews,
        low_stock_threshold: settings.low_stock_threshold,
        low_stock,
        orders: recent.iter().map(OrderRowView::from).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tiles_fill_missing_statuses() {
        let counts = [
            StatusCount {
                status: OrderStatus::Shipped,
                count: 4,
            },
            StatusCount {
                status: OrderStatus::Pending,
                count: 2,
            },
        ];
        let tiles = status_tiles(&counts);
        assert_eq!(tiles.len(), OrderStatus::ALL.len());
        assert_eq!(tiles[0].status, "pending");
        assert_eq!(tiles[0].count, 2);
        assert_eq!(tiles.iter().find(|t| t.status == "shipped").map(|t| t.count), Some(4));
        assert_eq!(tiles.iter().find(|t| t.status == "delivered").map(|t| t.count), Some(0));
    }

    #[test]
    fn test_revenue_format() {
        assert_eq!(format_revenue(Decimal::new(123_450, 2)), "€1234.50");
    }
}
