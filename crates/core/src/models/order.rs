//! Placed orders, their lines and the partners that deliver them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    ComboId, CustomerId, Email, OrderId, OrderLineId, OrderStatus, PaymentMethod, PaymentStatus,
    ProductId, ShippingPartnerId, VariantId,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
}

impl ShippingAddress {
    pub const DEFAULT_COUNTRY: &'static str = "Netherlands";

    /// Address lines for labels and e-mails.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        [
            self.full_name.clone(),
            self.street.clone(),
            format!("{} {}", self.postal_code, self.city).trim().to_owned(),
            self.country.clone(),
        ]
        .into_iter()
        .filter(|l| !l.is_empty())
        .collect()
    }
}

/// A checkout: the record created when a cart is placed.
///
/// Amounts are snapshots taken at checkout and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Order {
    pub id: OrderId,
    pub customer_id: Option<CustomerId>,
    pub email: Email,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[cfg_attr(feature = "postgres", sqlx(flatten))]
    pub address: ShippingAddress,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub shipping_fee: Decimal,
    pub total: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_partner_id: Option<ShippingPartnerId>,
    pub tracking_number: Option<String>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Customer-facing reference, e.g. `JW-000042`.
    #[must_use]
    pub fn order_number(&self) -> String {
        format_order_number(self.id)
    }
}

#[must_use]
pub fn format_order_number(id: OrderId) -> String {
    format!("JW-{:06}", id.as_i32())
}

/// A snapshot of one cart line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub combo_id: Option<ComboId>,
    pub title: String,
    pub variant_label: Option<String>,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// A carrier the shop hands parcels to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ShippingPartner {
    pub id: ShippingPartnerId,
    pub name: String,
    /// Tracking page with a `{tracking}` placeholder.
    pub tracking_url_template: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl ShippingPartner {
    pub const TRACKING_PLACEHOLDER: &'static str = "{tracking}";

    /// Tracking page for a parcel, if the partner has one.
    #[must_use]
    pub fn tracking_url(&self, tracking_number: &str) -> Option<String> {
        let template = self.tracking_url_template.as_deref()?;
        let code = tracking_number.trim();
        if code.is_empty() || !template.contains(Self::TRACKING_PLACEHOLDER) {
            return None;
        }
        Some(template.replace(Self::TRACKING_PLACEHOLDER, &urlencoding::encode(code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partner(template: Option<&str>) -> ShippingPartner {
        ShippingPartner {
            id: ShippingPartnerId::new(1),
            name: "PostNL".to_owned(),
            tracking_url_template: template.map(str::to_owned),
            contact_email: None,
            contact_phone: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_tracking_url() {
        let p = partner(Some("https://track.example.nl/?code={tracking}"));
        assert_eq!(
            p.tracking_url(" 3S ABC 123 ").as_deref(),
            Some("https://track.example.nl/?code=3S%20ABC%20123")
        );
        assert_eq!(p.tracking_url(""), None);
        assert_eq!(partner(None).tracking_url("3S"), None);
        assert_eq!(partner(Some("https://example.nl")).tracking_url("3S"), None);
    }

    #[test]
    fn test_order_number_is_zero_padded() {
        assert_eq!(format_order_number(OrderId::new(42)), "JW-000042");
        assert_eq!(format_order_number(OrderId::new(1_234_567)), "JW-1234567");
    }

    #[test]
    fn test_address_lines_skip_blanks() {
        let addr = ShippingAddress {
            full_name: "Sanne de Vries".to_owned(),
            street: "Kerkstraat 1".to_owned(),
            postal_code: "1234 AB".to_owned(),
            city: "Utrecht".to_owned(),
            ..ShippingAddress::default()
        };
        assert_eq!(
            addr.lines(),
            vec!["Sanne de Vries", "Kerkstraat 1", "1234 AB Utrecht"]
        );
    }
}
