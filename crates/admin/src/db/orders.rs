//! Order administration.
//!
//! Status changes run inside a transaction that first locks the order
//! row; see `services::orders`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::instrument;

use jouwwinkel_core::models::{Order, OrderLine};
use jouwwinkel_core::{
    CustomerId, Email, OrderId, OrderStatus, PaymentMethod, PaymentStatus, ShippingPartnerId,
};

use super::{PAGE_SIZE, RepositoryError, like_pattern, page_offset};

macro_rules! order_select {
    () => {
        "SELECT id, customer_id, email, status, payment_method, payment_status, \
         full_name, phone, street, postal_code, city, country, \
         subtotal, discount_total, shipping_fee, total, coupon_code, shipping_partner_id, \
         tracking_number, notes, created_at, updated_at, shipped_at, delivered_at \
         FROM shop.customer_order"
    };
}

/// One line of the order list.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: OrderId,
    pub customer_id: Option<CustomerId>,
    pub email: Email,
    pub full_name: String,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub total: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Filters for the order list.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Matches email, name or order number digits.
    pub search: Option<String>,
    pub page: u32,
}

/// Repository for order administration.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A page of orders, newest first, plus the total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &OrderFilter) -> Result<(Vec<OrderRow>, i64), RepositoryError> {
        let pattern = filter.search.as_deref().map(like_pattern);
        let order_id = filter.search.as_deref().and_then(parse_order_number);

        let rows = sqlx::query_as::<_, OrderRow>(
            "SELECT o.id, o.customer_id, o.email, o.full_name, o.status, o.payment_method, \
             o.payment_status, o.total, o.created_at, \
             (SELECT COALESCE(SUM(l.quantity), 0)::BIGINT FROM shop.order_line l \
              WHERE l.order_id = o.id) AS item_count \
             FROM shop.customer_order o \
             WHERE ($1::shop.order_status IS NULL OR o.status = $1) \
               AND ($2::TEXT IS NULL OR o.email ILIKE $2 OR o.full_name ILIKE $2 OR o.id = $3) \
             ORDER BY o.created_at DESC, o.id DESC LIMIT $4 OFFSET $5",
        )
        .bind(filter.status)
        .bind(pattern.as_deref())
        .bind(order_id)
        .bind(PAGE_SIZE)
        .bind(page_offset(filter.page))
        .fetch_all(self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM shop.customer_order o \
             WHERE ($1::shop.order_status IS NULL OR o.status = $1) \
               AND ($2::TEXT IS NULL OR o.email ILIKE $2 OR o.full_name ILIKE $2 OR o.id = $3)",
        )
        .bind(filter.status)
        .bind(pattern.as_deref())
        .bind(order_id)
        .fetch_one(self.pool)
        .await?;

        Ok((rows, total))
    }

    /// Orders of one customer, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(concat!(
            order_select!(),
            " WHERE customer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(concat!(order_select!(), " WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Lines of an order in insertion order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError> {
        lines(self.pool, order_id).await
    }
}

/// Accepts `JW-000042`, `jw-42` or `42`.
fn parse_order_number(raw: &str) -> Option<OrderId> {
    let raw = raw.trim();
    let digits = raw
        .get(..3)
        .filter(|p| p.eq_ignore_ascii_case("jw-"))
        .map_or(raw, |_| raw.get(3..).unwrap_or_default());
    digits.parse::<i32>().ok().filter(|n| *n > 0).map(OrderId::new)
}

/// Lines of an order on any executor.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lines<'e, E>(executor: E, order_id: OrderId) -> Result<Vec<OrderLine>, RepositoryError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, OrderLine>(
        "SELECT id, order_id, product_id, variant_id, combo_id, title, variant_label, \
         unit_price, quantity, line_total FROM shop.order_line WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(executor)
    .await?;
    Ok(rows)
}

// =============================================================================
// Transactional helpers
// =============================================================================

/// Lock an order for the rest of the transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, Order>(concat!(order_select!(), " WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row)
}

/// Set an order's status, stamping `shipped_at` / `delivered_at` on the way.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, Order>(
        "UPDATE shop.customer_order SET status = $2, updated_at = NOW(), \
         shipped_at = CASE WHEN $2 = 'shipped'::shop.order_status THEN NOW() ELSE shipped_at END, \
         delivered_at = CASE WHEN $2 = 'delivered'::shop.order_status THEN NOW() ELSE delivered_at END \
         WHERE id = $1 \
         RETURNING id, customer_id, email, status, payment_method, payment_status, \
         full_name, phone, street, postal_code, city, country, \
         subtotal, discount_total, shipping_fee, total, coupon_code, shipping_partner_id, \
         tracking_number, notes, created_at, updated_at, shipped_at, delivered_at",
    )
    .bind(id)
    .bind(status)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Record the carrier and tracking number.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_shipment(
    conn: &mut PgConnection,
    id: OrderId,
    partner_id: ShippingPartnerId,
    tracking_number: &str,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "UPDATE shop.customer_order SET shipping_partner_id = $2, tracking_number = $3, \
         updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(partner_id)
    .bind(tracking_number)
    .execute(conn)
    .await?;
    Ok(())
}

/// Set the payment status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_payment_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: PaymentStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.customer_order SET payment_status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order_number() {
        assert_eq!(parse_order_number("JW-000042"), Some(OrderId::new(42)));
        assert_eq!(parse_order_number(" jw-7 "), Some(OrderId::new(7)));
        assert_eq!(parse_order_number("42"), Some(OrderId::new(42)));
        assert_eq!(parse_order_number("jan@example.nl"), None);
        assert_eq!(parse_order_number("0"), None);
    }
}
