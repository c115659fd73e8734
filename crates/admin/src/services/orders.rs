//! Order workflow: status transitions, shipping and payment.
//!
//! Every change locks the order row first and commits stock and coupon
//! side effects together with the status change. Customer e-mails go out
//! after the commit.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use jouwwinkel_core::models::{Order, ShippingPartner};
use jouwwinkel_core::stock;
use jouwwinkel_core::{OrderId, OrderStatus, PaymentStatus, ShippingPartnerId, TransitionError};

use crate::db::{RepositoryError, coupons, orders};
use crate::services::email::{EmailService, OrderMail, Shipment, notifies_customer};

/// Longest tracking number accepted.
pub const MAX_TRACKING_LENGTH: usize = 64;

#[derive(Debug, Error)]
pub enum OrderActionError {
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("payment cannot go from {from} to {to}")]
    Payment { from: PaymentStatus, to: PaymentStatus },

    #[error("only orders that are being processed can be shipped")]
    NotShippable,

    #[error("pick an active shipping partner")]
    UnknownPartner,

    #[error("enter a tracking number of at most {MAX_TRACKING_LENGTH} characters")]
    InvalidTracking,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderActionError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Allowed payment status changes.
///
/// Payment is recorded by hand: an unpaid order can be marked paid and a
/// paid order refunded. Nothing moves back.
#[must_use]
pub const fn payment_change_allowed(from: PaymentStatus, to: PaymentStatus) -> bool {
    matches!(
        (from, to),
        (PaymentStatus::Unpaid, PaymentStatus::Paid) | (PaymentStatus::Paid, PaymentStatus::Refunded)
    )
}

/// Move an order to a new status.
///
/// Cancelling puts the stock back and releases the coupon use in the same
/// transaction. Shipping goes through [`ship`] so a carrier is recorded.
///
/// # Errors
///
/// Returns `OrderActionError::Transition` for a move the workflow does not
/// allow and `OrderActionError::NotFound` for an unknown order.
#[instrument(skip(pool))]
pub async fn transition(
    pool: &PgPool,
    id: OrderId,
    to: OrderStatus,
) -> Result<Order, OrderActionError> {
    if to == OrderStatus::Shipped {
        return Err(OrderActionError::NotShippable);
    }

    let mut tx = pool.begin().await?;
    let order = orders::lock(&mut tx, id)
        .await?
        .ok_or(OrderActionError::NotFound)?;

    let next = order.status.transition_to(to)?;
    let updated = orders::set_status(&mut tx, id, next).await?;

    if next == OrderStatus::Cancelled {
        stock::restore(&mut tx, id).await?;
        if let Some(code) = order.coupon_code.as_deref() {
            coupons::release_use(&mut tx, code).await?;
        }
    }

    tx.commit().await?;

    tracing::info!(order_id = %id, from = %order.status, to = %next, "Order status changed");
    Ok(updated)
}

/// Hand a processing order to a shipping partner.
///
/// # Errors
///
/// Returns `OrderActionError::NotShippable` unless the order is being
/// processed, `OrderActionError::UnknownPartner` for a missing or inactive
/// partner, and `OrderActionError::InvalidTracking` for a blank or overlong
/// tracking number.
#[instrument(skip(pool))]
pub async fn ship(
    pool: &PgPool,
    id: OrderId,
    partner_id: ShippingPartnerId,
    tracking_number: &str,
) -> Result<(Order, ShippingPartner), OrderActionError> {
    let tracking = tracking_number.trim();
    if tracking.is_empty() || tracking.chars().count() > MAX_TRACKING_LENGTH {
        return Err(OrderActionError::InvalidTracking);
    }

    let mut tx = pool.begin().await?;

    let partner = sqlx::query_as::<_, ShippingPartner>(
        "SELECT id, name, tracking_url_template, contact_email, contact_phone, is_active, created_at \
         FROM shop.shipping_partner WHERE id = $1 AND is_active",
    )
    .bind(partner_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(OrderActionError::UnknownPartner)?;

    let order = orders::lock(&mut tx, id)
        .await?
        .ok_or(OrderActionError::NotFound)?;
    if order.status != OrderStatus::Processing {
        return Err(OrderActionError::NotShippable);
    }

    orders::set_shipment(&mut tx, id, partner.id, tracking).await?;
    let updated = orders::set_status(&mut tx, id, OrderStatus::Shipped).await?;

    tx.commit().await?;

    tracing::info!(order_id = %id, partner = %partner.name, "Order shipped");
    Ok((updated, partner))
}

/// Record a payment status change.
///
/// # Errors
///
/// Returns `OrderActionError::Payment` for a change other than
/// unpaid to paid or paid to refunded.
#[instrument(skip(pool))]
pub async fn set_payment(
    pool: &PgPool,
    id: OrderId,
    to: PaymentStatus,
) -> Result<(), OrderActionError> {
    let mut tx = pool.begin().await?;
    let order = orders::lock(&mut tx, id)
        .await?
        .ok_or(OrderActionError::NotFound)?;

    if !payment_change_allowed(order.payment_status, to) {
        return Err(OrderActionError::Payment {
            from: order.payment_status,
            to,
        });
    }

    orders::set_payment_status(&mut tx, id, to).await?;
    tx.commit().await?;

    tracing::info!(order_id = %id, payment = %to, "Payment status changed");
    Ok(())
}

/// Send the customer the e-mail for the order's current status, if any.
///
/// Failures are logged. The status change itself has already been saved.
pub async fn notify_customer(
    mailer: &EmailService,
    order: &Order,
    mail: &OrderMail,
    shipment: Option<&Shipment>,
) {
    if !notifies_customer(order.status) {
        return;
    }

    let to = order.email.as_str();
    let result = match (order.status, shipment) {
        (OrderStatus::Shipped, Some(shipment)) => mailer.send_order_shipped(to, mail, shipment).await,
        (OrderStatus::Shipped, None) => return,
        (OrderStatus::Cancelled, _) => mailer.send_order_cancelled(to, mail).await,
        _ => mailer.send_order_confirmed(to, mail).await,
    };

    if let Err(e) = result {
        tracing::error!(order_id = %order.id, error = %e, "Failed to send order e-mail");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_changes() {
        assert!(payment_change_allowed(PaymentStatus::Unpaid, PaymentStatus::Paid));
        assert!(payment_change_allowed(PaymentStatus::Paid, PaymentStatus::Refunded));
        assert!(!payment_change_allowed(PaymentStatus::Unpaid, PaymentStatus::Refunded));
        assert!(!payment_change_allowed(PaymentStatus::Paid, PaymentStatus::Unpaid));
        assert!(!payment_change_allowed(PaymentStatus::Refunded, PaymentStatus::Paid));
        assert!(!payment_change_allowed(PaymentStatus::Paid, PaymentStatus::Paid));
    }

    #[test]
    fn test_error_messages() {
        let err = OrderActionError::Payment {
            from: PaymentStatus::Refunded,
            to: PaymentStatus::Paid,
        };
        assert_eq!(err.to_string(), "payment cannot go from refunded to paid");
        assert_eq!(
            OrderActionError::InvalidTracking.to_string(),
            "enter a tracking number of at most 64 characters"
        );
    }
}
