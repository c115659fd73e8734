//! Orders and order lines.
//!
//! Stock movements live in `jouwwinkel_core::stock`.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::instrument;

use jouwwinkel_core::models::{Order, OrderLine, ShippingAddress, ShippingPartner};
use jouwwinkel_core::{
    ComboId, CustomerId, Email, OrderId, OrderLineId, OrderStatus, PaymentMethod, ProductId,
    ShippingPartnerId, VariantId,
};

use super::RepositoryError;

macro_rules! order_select {
    () => {
        "SELECT id, customer_id, email, status, payment_method, payment_status, \
         full_name, phone, street, postal_code, city, country, \
         subtotal, discount_total, shipping_fee, total, coupon_code, shipping_partner_id, \
         tracking_number, notes, created_at, updated_at, shipped_at, delivered_at \
         FROM shop.customer_order"
    };
}

macro_rules! order_returning {
    () => {
        " RETURNING id, customer_id, email, status, payment_method, payment_status, \
         full_name, phone, street, postal_code, city, country, \
         subtotal, discount_total, shipping_fee, total, coupon_code, shipping_partner_id, \
         tracking_number, notes, created_at, updated_at, shipped_at, delivered_at"
    };
}

/// Header of an order about to be placed.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub email: Email,
    pub payment_method: PaymentMethod,
    pub address: ShippingAddress,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub notes: String,
}

/// A line about to be stored, with the title and price at time of sale.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub combo_id: Option<ComboId>,
    pub title: String,
    pub variant_label: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Repository for a customer's order history.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, Order>(concat!(
            order_select!(),
            " WHERE customer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(customer_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// One order, only if it belongs to the customer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_customer(
        &self,
        id: OrderId,
        customer_id: CustomerId,
    ) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, Order>(concat!(
            order_select!(),
            " WHERE id = $1 AND customer_id = $2"
        ))
        .bind(id)
        .bind(customer_id)
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

    /// The carrier an order was handed to.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn shipping_partner(
        &self,
        id: ShippingPartnerId,
    ) -> Result<Option<ShippingPartner>, RepositoryError> {
        let row = sqlx::query_as::<_, ShippingPartner>(
            "SELECT id, name, tracking_url_template, contact_email, contact_phone, is_active, \
             created_at FROM shop.shipping_partner WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Whether the customer has received this product in a delivered order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn has_delivered_purchase(
        &self,
        customer_id: CustomerId,
        product_id: ProductId,
    ) -> Result<bool, RepositoryError> {
        let found: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM shop.customer_order o \
                JOIN shop.order_line l ON l.order_id = o.id \
                LEFT JOIN shop.combo_item ci ON ci.combo_id = l.combo_id \
                WHERE o.customer_id = $1 AND o.status = 'delivered' \
                  AND (l.product_id = $2 OR ci.product_id = $2))",
        )
        .bind(customer_id)
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;
        Ok(found)
    }
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

/// Insert an order header.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
#[instrument(skip_all, fields(customer_id = %order.customer_id))]
pub async fn insert_order(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, Order>(concat!(
        "INSERT INTO shop.customer_order (customer_id, email, payment_method, full_name, phone, \
         street, postal_code, city, country, subtotal, discount_total, shipping_fee, total, \
         coupon_code, notes) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        order_returning!()
    ))
    .bind(order.customer_id)
    .bind(&order.email)
    .bind(order.payment_method)
    .bind(&order.address.full_name)
    .bind(&order.address.phone)
    .bind(&order.address.street)
    .bind(&order.address.postal_code)
    .bind(&order.address.city)
    .bind(&order.address.country)
    .bind(order.subtotal)
    .bind(order.discount_total)
    .bind(order.shipping_fee)
    .bind(order.total)
    .bind(order.coupon_code.as_deref())
    .bind(&order.notes)
    .fetch_one(conn)
    .await?;
    Ok(row)
}

/// Insert one order line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &NewOrderLine,
) -> Result<OrderLineId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderLineId>(
        "INSERT INTO shop.order_line (order_id, product_id, variant_id, combo_id, title, \
         variant_label, unit_price, quantity, line_total) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.variant_id)
    .bind(line.combo_id)
    .bind(&line.title)
    .bind(line.variant_label.as_deref())
    .bind(line.unit_price)
    .bind(line.quantity)
    .bind(line.line_total)
    .fetch_one(conn)
    .await?;
    Ok(id)
}

/// Lock an order owned by the customer.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_for_customer(
    conn: &mut PgConnection,
    id: OrderId,
    customer_id: CustomerId,
) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, Order>(concat!(
        order_select!(),
        " WHERE id = $1 AND customer_id = $2 FOR UPDATE"
    ))
    .bind(id)
    .bind(customer_id)
    .fetch_optional(conn)
    .await?;
    Ok(row)
}

/// Set an order's status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE shop.customer_order SET status = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(status)
        .execute(conn)
        .await?;
    Ok(())
}
