//! Customer-side order changes.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use jouwwinkel_core::stock;
use jouwwinkel_core::{CustomerId, OrderId, OrderStatus};

use crate::db::{RepositoryError, coupons, orders};

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error("an order that is {0} can no longer be cancelled")]
    NotCancellable(OrderStatus),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Cancel a pending order on the customer's request.
///
/// Stock goes back to the shelves and the coupon use is released, in the
/// same transaction as the status change.
///
/// # Errors
///
/// Returns `OrderError::NotFound` when the order isn't the customer's and
/// `OrderError::NotCancellable` once it has been confirmed.
#[instrument(skip(pool))]
pub async fn cancel_order(
    pool: &PgPool,
    order_id: OrderId,
    customer_id: CustomerId,
) -> Result<(), OrderError> {
    let mut tx = pool.begin().await?;

    let order = orders::lock_for_customer(&mut tx, order_id, customer_id)
        .await?
        .ok_or(OrderError::NotFound)?;

    if !order.status.customer_cancellable() {
        return Err(OrderError::NotCancellable(order.status));
    }

    orders::set_status(&mut tx, order.id, OrderStatus::Cancelled).await?;
    stock::restore(&mut tx, order.id).await?;
    if let Some(code) = order.coupon_code.as_deref() {
        coupons::release_use(&mut *tx, code).await?;
    }

    tx.commit().await?;

    tracing::info!(order_id = %order.id, "Order cancelled by customer");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_cancellable_message() {
        let err = OrderError::NotCancellable(OrderStatus::Shipped);
        assert_eq!(err.to_string(), "an order that is shipped can no longer be cancelled");
    }
}
