//! Placing an order.
//!
//! Everything happens in one transaction: the cart is re-priced, the coupon
//! is locked and counted, stock is taken with guarded updates and the order
//! is written with snapshot titles and prices. Any failure rolls it all back.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use jouwwinkel_core::cart::{Cart, CartItem, CartTotals, PricedLine, ShippingRule};
use jouwwinkel_core::coupon::CouponError;
use jouwwinkel_core::models::{Order, ShippingAddress};
use jouwwinkel_core::stock::{self, StockSource, StockTake};
use jouwwinkel_core::validation::ValidationErrors;
use jouwwinkel_core::{CustomerId, Email, PaymentMethod};

use super::cart::{CatalogSnapshot, build_lines};
use crate::db::orders::{self, NewOrder, NewOrderLine};
use crate::db::{RepositoryError, coupons};

const MAX_NAME: usize = 120;
const MAX_PHONE: usize = 32;
const MAX_STREET: usize = 200;
const MAX_POSTAL_CODE: usize = 16;
const MAX_CITY: usize = 100;
const MAX_COUNTRY: usize = 60;
const MAX_NOTES: usize = 1000;

/// Errors that stop an order from being placed.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("the cart is empty")]
    EmptyCart,

    /// Items disappeared from the catalog since the cart was last shown.
    #[error("some items in the cart are no longer available")]
    CartChanged,

    #[error("not enough stock for {title}")]
    OutOfStock { title: String },

    #[error("{0}")]
    Coupon(#[from] CouponError),

    #[error("invalid checkout details")]
    Invalid(ValidationErrors),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Address fields as posted by the checkout and profile forms.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub country: String,
}

impl AddressForm {
    /// Validate into an address. Checkout needs a complete address; the
    /// profile only needs a name.
    ///
    /// # Errors
    ///
    /// Returns every field problem at once.
    pub fn validate(&self, complete: bool) -> Result<ShippingAddress, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let full_name = errors.text("full_name", &self.full_name, MAX_NAME, true);
        let phone = errors.text("phone", &self.phone, MAX_PHONE, false);
        let street = errors.text("street", &self.street, MAX_STREET, complete);
        let postal_code = errors
            .text("postal_code", &self.postal_code, MAX_POSTAL_CODE, complete)
            .to_uppercase();
        let city = errors.text("city", &self.city, MAX_CITY, complete);
        let country = errors
            .optional_text("country", &self.country, MAX_COUNTRY)
            .unwrap_or_else(|| ShippingAddress::DEFAULT_COUNTRY.to_owned());

        errors.into_result(ShippingAddress {
            full_name,
            phone,
            street,
            postal_code,
            city,
            country,
        })
    }
}

impl From<&ShippingAddress> for AddressForm {
    fn from(address: &ShippingAddress) -> Self {
        Self {
            full_name: address.full_name.clone(),
            phone: address.phone.clone(),
            street: address.street.clone(),
            postal_code: address.postal_code.clone(),
            city: address.city.clone(),
            country: address.country.clone(),
        }
    }
}

/// Who is ordering and where it goes.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub customer_id: CustomerId,
    pub email: Email,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub notes: String,
}

/// Validate the free-text order notes.
///
/// # Errors
///
/// Returns `CheckoutError::Invalid` when the notes are too long.
pub fn validate_notes(raw: &str) -> Result<String, CheckoutError> {
    let mut errors = ValidationErrors::new();
    let notes = errors.text("notes", raw, MAX_NOTES, false);
    errors.into_result(notes).map_err(CheckoutError::Invalid)
}

fn quantity(line: &PricedLine) -> i32 {
    i32::try_from(line.quantity).unwrap_or(i32::MAX)
}

fn order_line(line: &PricedLine) -> NewOrderLine {
    let (product_id, variant_id, combo_id) = match line.item {
        CartItem::Product {
            product_id,
            variant_id,
        } => (Some(product_id), variant_id, None),
        CartItem::Combo { combo_id } => (None, None, Some(combo_id)),
    };
    NewOrderLine {
        product_id,
        variant_id,
        combo_id,
        title: line.title.clone(),
        variant_label: line.variant_label.clone(),
        unit_price: line.unit_price,
        quantity: quantity(line),
        line_total: line.line_total(),
    }
}

/// The stock counters a line draws from: its variant, its product, or every
/// component of its combo at the recipe loaded for this checkout.
fn stock_takes(line: &PricedLine, snapshot: &CatalogSnapshot) -> Vec<StockTake> {
    let qty = quantity(line);
    match line.item {
        CartItem::Product {
            product_id,
            variant_id: Some(variant_id),
        } => vec![StockTake::new(
            StockSource::Variant {
                product_id,
                variant_id,
            },
            qty,
        )],
        CartItem::Product {
            product_id,
            variant_id: None,
        } => vec![StockTake::new(StockSource::Product(product_id), qty)],
        CartItem::Combo { combo_id } => snapshot
            .combo_items
            .get(&combo_id)
            .into_iter()
            .flatten()
            .map(|component| {
                StockTake::new(
                    StockSource::Product(component.product_id),
                    component.quantity.saturating_mul(qty),
                )
            })
            .collect(),
    }
}

/// Place an order for the cart.
///
/// The cart itself is not modified; the caller clears it on success.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` or `CheckoutError::CartChanged` when
/// the cart cannot be ordered as shown, `CheckoutError::OutOfStock` for the
/// first line that cannot be filled, `CheckoutError::Coupon` when the coupon
/// no longer applies, and `CheckoutError::Repository` for database failures.
#[instrument(skip_all, fields(customer_id = %request.customer_id))]
pub async fn place_order(
    pool: &PgPool,
    cart: &Cart,
    rule: &ShippingRule,
    request: CheckoutRequest,
    now: DateTime<Utc>,
) -> Result<Order, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut tx = pool.begin().await?;

    let snapshot = CatalogSnapshot::load(&mut tx, cart).await?;
    let (lines, dropped) = build_lines(cart, &snapshot);
    if !dropped.is_empty() {
        return Err(CheckoutError::CartChanged);
    }
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
    let (coupon_code, discount) = match cart.coupon_code() {
        Some(code) => {
            let coupon = coupons::lock_by_code(&mut *tx, code)
                .await?
                .ok_or(CouponError::Unknown)?;
            let discount = coupon.discount_for(subtotal, now)?;
            if !coupons::record_use(&mut *tx, &coupon.code).await? {
                return Err(CouponError::UsageLimitReached.into());
            }
            (Some(coupon.code), discount)
        }
        None => (None, Decimal::ZERO),
    };

    let mut taken = Vec::with_capacity(lines.len());
    for line in &lines {
        let takes = stock_takes(line, &snapshot);
        for take in &takes {
            if !stock::take(&mut tx, *take).await? {
                tracing::info!(item = %line.item, "Checkout stopped on insufficient stock");
                return Err(CheckoutError::OutOfStock {
                    title: line.title.clone(),
                });
            }
        }
        taken.push(takes);
    }

    let totals = CartTotals::compute(&lines, discount, rule);
    let order = orders::insert_order(
        &mut tx,
        &NewOrder {
            customer_id: request.customer_id,
            email: request.email,
            payment_method: request.payment_method,
            address: request.address,
            subtotal: totals.subtotal,
            discount_total: totals.discount,
            shipping_fee: totals.shipping,
            total: totals.total,
            coupon_code,
            notes: request.notes,
        },
    )
    .await?;

    for (line, takes) in lines.iter().zip(&taken) {
        let line_id = orders::insert_line(&mut tx, order.id, &order_line(line)).await?;
        stock::record(&mut tx, line_id, takes).await?;
    }

    tx.commit().await?;

    tracing::info!(order_id = %order.id, total = %order.total, "Order placed");
    Ok(order)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use jouwwinkel_core::models::ComboItem;
    use jouwwinkel_core::{ComboId, ProductId, VariantId};

    use super::*;

    fn form() -> AddressForm {
        AddressForm {
            full_name: " Sanne de Vries ".to_owned(),
            phone: String::new(),
            street: "Keizersgracht 1".to_owned(),
            postal_code: "1015 cj".to_owned(),
            city: "Amsterdam".to_owned(),
            country: String::new(),
        }
    }

    #[test]
    fn test_complete_address() {
        let address = form().validate(true).unwrap();
        assert_eq!(address.full_name, "Sanne de Vries");
        assert_eq!(address.postal_code, "1015 CJ");
        assert_eq!(address.country, ShippingAddress::DEFAULT_COUNTRY);
    }

    #[test]
    fn test_checkout_requires_street_and_city() {
        let mut input = form();
        input.street.clear();
        input.city = "  ".to_owned();
        let errors = input.validate(true).unwrap_err();
        assert!(errors.get("street").is_some());
        assert!(errors.get("city").is_some());
        assert!(errors.get("full_name").is_none());
    }

    #[test]
    fn test_profile_allows_missing_address() {
        let input = AddressForm {
            full_name: "Sanne".to_owned(),
            ..AddressForm::default()
        };
        assert!(input.validate(false).is_ok());
    }

    #[test]
    fn test_country_is_kept_when_given() {
        let mut input = form();
        input.country = " Belgium ".to_owned();
        assert_eq!(input.validate(true).unwrap().country, "Belgium");
        input.country = "x".repeat(MAX_COUNTRY + 1);
        assert!(input.validate(true).unwrap_err().get("country").is_some());
    }

    #[test]
    fn test_order_line_references() {
        let mut line = PricedLine {
            item: CartItem::product(ProductId::new(4), Some(VariantId::new(9))),
            title: "Shirt".to_owned(),
            slug: "shirt".to_owned(),
            variant_label: Some("Red / M".to_owned()),
            image_url: None,
            unit_price: Decimal::new(1250, 2),
            quantity: 3,
            available: Some(10),
        };
        let row = order_line(&line);
        assert_eq!(row.product_id, Some(ProductId::new(4)));
        assert_eq!(row.variant_id, Some(VariantId::new(9)));
        assert_eq!(row.combo_id, None);
        assert_eq!(row.line_total, Decimal::new(3750, 2));

        line.item = CartItem::combo(ComboId::new(2));
        let row = order_line(&line);
        assert_eq!(row.product_id, None);
        assert_eq!(row.combo_id, Some(ComboId::new(2)));
    }

    #[test]
    fn test_stock_takes_follow_the_line() {
        let mut snapshot = CatalogSnapshot::default();
        snapshot.combo_items.insert(
            ComboId::new(2),
            vec![
                ComboItem {
                    combo_id: ComboId::new(2),
                    product_id: ProductId::new(5),
                    quantity: 2,
                },
                ComboItem {
                    combo_id: ComboId::new(2),
                    product_id: ProductId::new(6),
                    quantity: 1,
                },
            ],
        );
        let mut line = PricedLine {
            item: CartItem::combo(ComboId::new(2)),
            title: "Starter".to_owned(),
            slug: "starter".to_owned(),
            variant_label: None,
            image_url: None,
            unit_price: Decimal::new(2500, 2),
            quantity: 3,
            available: Some(4),
        };
        assert_eq!(
            stock_takes(&line, &snapshot),
            vec![
                StockTake::new(StockSource::Product(ProductId::new(5)), 6),
                StockTake::new(StockSource::Product(ProductId::new(6)), 3),
            ]
        );

        line.item = CartItem::product(ProductId::new(4), Some(VariantId::new(9)));
        assert_eq!(
            stock_takes(&line, &snapshot),
            vec![StockTake::new(
                StockSource::Variant {
                    product_id: ProductId::new(4),
                    variant_id: VariantId::new(9),
                },
                3,
            )]
        );

        line.item = CartItem::product(ProductId::new(4), None);
        assert_eq!(
            stock_takes(&line, &snapshot),
            vec![StockTake::new(StockSource::Product(ProductId::new(4)), 3)]
        );
    }

    #[test]
    fn test_notes_length() {
        assert_eq!(validate_notes("  leave at door ").unwrap(), "leave at door");
        assert!(matches!(
            validate_notes(&"x".repeat(MAX_NOTES + 1)),
            Err(CheckoutError::Invalid(_))
        ));
    }
}
