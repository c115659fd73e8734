//! Catalog records: categories, products, variants and combos.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, ComboId, ProductId, VariantId, VariantOptionId, round_money};
use crate::variants::combination_label;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A sellable product.
///
/// When a product has variants, stock is tracked per [`Variant`] and
/// `stock` on the product is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    /// Former price, shown struck through when higher than `price`.
    pub compare_at_price: Option<Decimal>,
    pub stock: i32,
    pub image_urls: Vec<String>,
    pub is_featured: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whole-percent saving against `compare_at_price`, e.g. 25 for
    /// €30.00 → €22.50.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        let compare_at = self.compare_at_price?;
        if compare_at <= self.price || compare_at <= Decimal::ZERO {
            return None;
        }
        let pct = ((compare_at - self.price) / compare_at * Decimal::ONE_HUNDRED).round();
        pct.to_u32().filter(|p| *p > 0)
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.image_urls.first().map(String::as_str)
    }
}

/// One option axis of a product, e.g. `Size: S, M, L`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct VariantOption {
    pub id: VariantOptionId,
    pub product_id: ProductId,
    pub name: String,
    pub values: Vec<String>,
    pub position: i32,
}

/// A purchasable combination of option values with its own stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    /// One value per option, in option position order.
    pub option_values: Vec<String>,
    pub sku: Option<String>,
    /// Replaces the product price when set.
    pub price_override: Option<Decimal>,
    pub stock: i32,
}

impl Variant {
    #[must_use]
    pub fn label(&self) -> String {
        combination_label(&self.option_values)
    }

    #[must_use]
    pub fn unit_price(&self, product: &Product) -> Decimal {
        self.price_override.unwrap_or(product.price)
    }
}

/// A bundle of products sold together at one price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Combo {
    pub id: ComboId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image_url: Option<String>,
    pub price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct ComboItem {
    pub combo_id: ComboId,
    pub product_id: ProductId,
    pub quantity: i32,
}

/// What a customer saves buying the combo instead of its parts.
///
/// `components` yields `(unit price, quantity)` pairs. Never negative.
pub fn combo_savings(
    combo_price: Decimal,
    components: impl IntoIterator<Item = (Decimal, i32)>,
) -> Decimal {
    let separately: Decimal = components
        .into_iter()
        .map(|(price, qty)| price * Decimal::from(qty))
        .sum();
    round_money((separately - combo_price).max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: i64, compare_at: Option<i64>) -> Product {
        Product {
            id: ProductId::new(1),
            category_id: None,
            name: "Linnen jurk".to_owned(),
            slug: "linnen-jurk".to_owned(),
            description: String::new(),
            price: Decimal::new(price, 2),
            compare_at_price: compare_at.map(|c| Decimal::new(c, 2)),
            stock: 3,
            image_urls: vec![],
            is_featured: false,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_discount_percent() {
        assert_eq!(product(2250, Some(3000)).discount_percent(), Some(25));
        assert_eq!(product(1999, Some(2999)).discount_percent(), Some(33));
        assert_eq!(product(3000, Some(3000)).discount_percent(), None);
        assert_eq!(product(3000, Some(2000)).discount_percent(), None);
        assert_eq!(product(3000, None).discount_percent(), None);
    }

    #[test]
    fn test_variant_price_override() {
        let p = product(2000, None);
        let mut v = Variant {
            id: VariantId::new(1),
            product_id: p.id,
            option_values: vec!["M".to_owned(), "Rood".to_owned()],
            sku: None,
            price_override: None,
            stock: 1,
        };
        assert_eq!(v.unit_price(&p), Decimal::new(2000, 2));
        v.price_override = Some(Decimal::new(2500, 2));
        assert_eq!(v.unit_price(&p), Decimal::new(2500, 2));
        assert_eq!(v.label(), "M / Rood");
    }

    #[test]
    fn test_combo_savings() {
        let parts = [(Decimal::new(1000, 2), 2), (Decimal::new(550, 2), 1)];
        assert_eq!(combo_savings(Decimal::new(2000, 2), parts), Decimal::new(550, 2));
        assert_eq!(combo_savings(Decimal::new(9000, 2), parts), Decimal::ZERO);
    }
}
