//! Stock taken by orders and given back on cancellation.
//!
//! Checkout records every counter it decrements in `shop.order_line_stock`,
//! one row per product or variant. Cancelling replays those rows instead
//! of re-deriving them from the catalog, which may have changed since: a
//! combo can be re-composed and a variant can be regenerated away.
//!
//! A row remembers which kind of counter it came from. When its variant
//! has been deleted the units are lost with it; they never fall through
//! to the parent product.

use sqlx::PgConnection;

use crate::{OrderId, OrderLineId, ProductId, VariantId};

/// The counter units were taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockSource {
    /// A product without variants, sold alone or inside a combo.
    Product(ProductId),
    /// One variant of a product.
    Variant {
        product_id: ProductId,
        variant_id: VariantId,
    },
}

/// Units taken from one counter for one order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockTake {
    pub source: StockSource,
    pub quantity: i32,
}

impl StockTake {
    #[must_use]
    pub const fn new(source: StockSource, quantity: i32) -> Self {
        Self { source, quantity }
    }

    const fn product_id(&self) -> ProductId {
        match self.source {
            StockSource::Product(product_id) | StockSource::Variant { product_id, .. } => product_id,
        }
    }

    const fn variant_id(&self) -> Option<VariantId> {
        match self.source {
            StockSource::Product(_) => None,
            StockSource::Variant { variant_id, .. } => Some(variant_id),
        }
    }
}

/// Take units from the counter. `false` when there are too few.
///
/// The update is guarded (`stock >= qty`), so concurrent checkouts can
/// never drive a counter negative.
///
/// # Errors
///
/// Returns the database error if the update fails.
pub async fn take(conn: &mut PgConnection, take: StockTake) -> Result<bool, sqlx::Error> {
    let result = match take.source {
        StockSource::Product(product_id) => {
            sqlx::query(
                "UPDATE shop.product SET stock = stock - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(product_id)
            .bind(take.quantity)
            .execute(conn)
            .await?
        }
        StockSource::Variant { variant_id, .. } => {
            sqlx::query("UPDATE shop.variant SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
                .bind(variant_id)
                .bind(take.quantity)
                .execute(conn)
                .await?
        }
    };
    Ok(result.rows_affected() == 1)
}

/// Remember what a line took.
///
/// # Errors
///
/// Returns the database error if an insert fails.
pub async fn record(
    conn: &mut PgConnection,
    order_line_id: OrderLineId,
    takes: &[StockTake],
) -> Result<(), sqlx::Error> {
    for take in takes {
        sqlx::query(
            "INSERT INTO shop.order_line_stock \
             (order_line_id, product_id, variant_id, from_variant, quantity) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order_line_id)
        .bind(take.product_id())
        .bind(take.variant_id())
        .bind(take.variant_id().is_some())
        .bind(take.quantity)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Put back everything an order took.
///
/// Variant units go to the variant if it still exists. Product units go to
/// the product unless it has variants by now, since such a product sells
/// from its variants only.
///
/// # Errors
///
/// Returns the database error if an update fails.
pub async fn restore(conn: &mut PgConnection, order_id: OrderId) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE shop.variant v SET stock = v.stock + s.qty \
         FROM (SELECT s.variant_id, SUM(s.quantity) AS qty \
               FROM shop.order_line_stock s JOIN shop.order_line l ON l.id = s.order_line_id \
               WHERE l.order_id = $1 AND s.from_variant AND s.variant_id IS NOT NULL \
               GROUP BY s.variant_id) s \
         WHERE v.id = s.variant_id",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        "UPDATE shop.product p SET stock = p.stock + s.qty, updated_at = NOW() \
         FROM (SELECT s.product_id, SUM(s.quantity) AS qty \
               FROM shop.order_line_stock s JOIN shop.order_line l ON l.id = s.order_line_id \
               WHERE l.order_id = $1 AND NOT s.from_variant AND s.product_id IS NOT NULL \
               GROUP BY s.product_id) s \
         WHERE p.id = s.product_id \
           AND NOT EXISTS (SELECT 1 FROM shop.variant v WHERE v.product_id = p.id)",
    )
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_columns() {
        let plain = StockTake::new(StockSource::Product(ProductId::new(3)), 2);
        assert_eq!(plain.product_id(), ProductId::new(3));
        assert_eq!(plain.variant_id(), None);

        let variant = StockTake::new(
            StockSource::Variant {
                product_id: ProductId::new(3),
                variant_id: VariantId::new(8),
            },
            1,
        );
        assert_eq!(variant.product_id(), ProductId::new(3));
        assert_eq!(variant.variant_id(), Some(VariantId::new(8)));
    }
}
