//! The shopping cart and its totals.
//!
//! [`Cart`] is what lives in the customer's session: item references and
//! quantities only. Prices are never trusted from the session; the
//! storefront re-prices every entry from the database into [`PricedLine`]s
//! and [`CartTotals::compute`] does the arithmetic.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ComboId, ProductId, VariantId, round_money};

/// Upper bound on the quantity of a single line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// What a cart line points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CartItem {
    Product {
        product_id: ProductId,
        variant_id: Option<VariantId>,
    },
    Combo {
        combo_id: ComboId,
    },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid cart item key: {0}")]
pub struct CartKeyError(String);

impl CartItem {
    #[must_use]
    pub const fn product(product_id: ProductId, variant_id: Option<VariantId>) -> Self {
        Self::Product {
            product_id,
            variant_id,
        }
    }

    #[must_use]
    pub const fn combo(combo_id: ComboId) -> Self {
        Self::Combo { combo_id }
    }

    /// Form-safe key: `p12`, `p12-v5` or `c3`.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CartItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product {
                product_id,
                variant_id: None,
            } => write!(f, "p{product_id}"),
            Self::Product {
                product_id,
                variant_id: Some(variant_id),
            } => write!(f, "p{product_id}-v{variant_id}"),
            Self::Combo { combo_id } => write!(f, "c{combo_id}"),
        }
    }
}

impl FromStr for CartItem {
    type Err = CartKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CartKeyError(s.to_owned());
        let parse_id = |raw: &str| raw.parse::<i32>().ok().filter(|id| *id > 0);

        if let Some(rest) = s.strip_prefix('c') {
            let id = parse_id(rest).ok_or_else(err)?;
            return Ok(Self::combo(ComboId::new(id)));
        }
        let rest = s.strip_prefix('p').ok_or_else(err)?;
        match rest.split_once("-v") {
            Some((product, variant)) => {
                let product = parse_id(product).ok_or_else(err)?;
                let variant = parse_id(variant).ok_or_else(err)?;
                Ok(Self::product(
                    ProductId::new(product),
                    Some(VariantId::new(variant)),
                ))
            }
            None => {
                let product = parse_id(rest).ok_or_else(err)?;
                Ok(Self::product(ProductId::new(product), None))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub item: CartItem,
    pub quantity: u32,
}

/// Session-persisted cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    entries: Vec<CartEntry>,
    coupon_code: Option<String>,
}

impl Cart {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> &[CartEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of units across lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.entries.iter().map(|e| e.quantity).sum()
    }

    #[must_use]
    pub fn quantity_of(&self, item: &CartItem) -> u32 {
        self.entries
            .iter()
            .find(|e| e.item == *item)
            .map_or(0, |e| e.quantity)
    }

    /// Add units, merging with an existing line. Adding zero does nothing.
    pub fn add(&mut self, item: CartItem, quantity: u32) {
        if quantity == 0 {
            return;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item == item) {
            entry.quantity = entry.quantity.saturating_add(quantity).min(MAX_LINE_QUANTITY);
        } else {
            self.entries.push(CartEntry {
                item,
                quantity: quantity.min(MAX_LINE_QUANTITY),
            });
        }
    }

    /// Replace a line's quantity; zero removes the line.
    pub fn set_quantity(&mut self, item: &CartItem, quantity: u32) {
        if quantity == 0 {
            self.remove(item);
            return;
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item == *item) {
            entry.quantity = quantity.min(MAX_LINE_QUANTITY);
        }
    }

    pub fn remove(&mut self, item: &CartItem) {
        self.entries.retain(|e| e.item != *item);
    }

    /// Drop every line the predicate rejects, returning how many went.
    pub fn retain(&mut self, mut keep: impl FnMut(&CartItem) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| keep(&e.item));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.coupon_code = None;
    }

    #[must_use]
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// Set or clear the coupon. Codes are stored upper-cased.
    pub fn set_coupon(&mut self, code: Option<&str>) {
        self.coupon_code = code
            .map(|c| c.trim().to_uppercase())
            .filter(|c| !c.is_empty());
    }
}

/// A cart entry after looking up its current price and stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub item: CartItem,
    pub title: String,
    pub slug: String,
    pub variant_label: Option<String>,
    pub image_url: Option<String>,
    pub unit_price: Decimal,
    pub quantity: u32,
    /// Units still in stock; `None` when stock is not tracked for the line.
    pub available: Option<u32>,
}

impl PricedLine {
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        round_money(self.unit_price * Decimal::from(self.quantity))
    }

    /// More units requested than are in stock.
    #[must_use]
    pub fn is_short(&self) -> bool {
        self.available.is_some_and(|a| self.quantity > a)
    }
}

/// Flat-rate shipping with an optional free-shipping threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRule {
    pub flat_fee: Decimal,
    pub free_threshold: Option<Decimal>,
}

impl ShippingRule {
    /// Fee for a cart whose discounted subtotal is `amount`.
    #[must_use]
    pub fn fee_for(&self, amount: Decimal, is_empty: bool) -> Decimal {
        if is_empty {
            return Decimal::ZERO;
        }
        match self.free_threshold {
            Some(threshold) if amount >= threshold => Decimal::ZERO,
            _ => self.flat_fee.max(Decimal::ZERO),
        }
    }

    /// How much more the customer must spend for free shipping.
    #[must_use]
    pub fn remaining_for_free(&self, amount: Decimal) -> Option<Decimal> {
        let threshold = self.free_threshold?;
        (amount < threshold).then(|| threshold - amount)
    }
}

/// Cart arithmetic result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    pub item_count: u32,
}

impl CartTotals {
    /// Recalculate totals.
    ///
    /// The discount is clamped into `[0, subtotal]`, so the total is never
    /// negative and always equals `subtotal - discount + shipping`.
    #[must_use]
    pub fn compute(lines: &[PricedLine], discount: Decimal, rule: &ShippingRule) -> Self {
        let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
        let discount = round_money(discount.clamp(Decimal::ZERO, subtotal));
        let after_discount = subtotal - discount;
        let shipping = round_money(rule.fee_for(after_discount, lines.is_empty()));
        Self {
            subtotal,
            discount,
            shipping,
            total: after_discount + shipping,
            item_count: lines.iter().map(|l| l.quantity).sum(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: i32, cents: i64, qty: u32) -> PricedLine {
        PricedLine {
            item: CartItem::product(ProductId::new(id), None),
            title: format!("Product {id}"),
            slug: format!("product-{id}"),
            variant_label: None,
            image_url: None,
            unit_price: Decimal::new(cents, 2),
            quantity: qty,
            available: Some(10),
        }
    }

    const RULE: ShippingRule = ShippingRule {
        flat_fee: Decimal::from_parts(495, 0, 0, false, 2),
        free_threshold: Some(Decimal::from_parts(5000, 0, 0, false, 2)),
    };

    #[test]
    fn test_item_keys_round_trip() {
        for item in [
            CartItem::product(ProductId::new(12), None),
            CartItem::product(ProductId::new(12), Some(VariantId::new(5))),
            CartItem::combo(ComboId::new(3)),
        ] {
            assert_eq!(item.key().parse::<CartItem>().unwrap(), item);
        }
        assert_eq!(
            "p12-v5".parse::<CartItem>().unwrap(),
            CartItem::product(ProductId::new(12), Some(VariantId::new(5)))
        );
        for bad in ["", "x1", "p", "p-1", "p1-v", "c0", "p1-v-2"] {
            assert!(bad.parse::<CartItem>().is_err(), "{bad} should not parse");
        }
    }

    #[test]
    fn test_add_merges_and_clamps() {
        let mut cart = Cart::new();
        let item = CartItem::product(ProductId::new(1), None);
        cart.add(item, 2);
        cart.add(item, 3);
        assert_eq!(cart.entries().len(), 1);
        assert_eq!(cart.quantity_of(&item), 5);

        cart.add(item, 500);
        assert_eq!(cart.quantity_of(&item), MAX_LINE_QUANTITY);

        cart.add(CartItem::combo(ComboId::new(1)), 0);
        assert_eq!(cart.entries().len(), 1);
    }

    #[test]
    fn test_variants_are_separate_lines() {
        let mut cart = Cart::new();
        cart.add(CartItem::product(ProductId::new(1), Some(VariantId::new(1))), 1);
        cart.add(CartItem::product(ProductId::new(1), Some(VariantId::new(2))), 1);
        assert_eq!(cart.entries().len(), 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        let item = CartItem::combo(ComboId::new(9));
        cart.add(item, 4);
        cart.set_quantity(&item, 1);
        assert_eq!(cart.quantity_of(&item), 1);
        cart.set_quantity(&item, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_coupon_normalised_and_cleared() {
        let mut cart = Cart::new();
        cart.set_coupon(Some("  zomer10 "));
        assert_eq!(cart.coupon_code(), Some("ZOMER10"));
        cart.set_coupon(Some(""));
        assert_eq!(cart.coupon_code(), None);
        cart.set_coupon(Some("x"));
        cart.clear();
        assert_eq!(cart.coupon_code(), None);
    }

    #[test]
    fn test_totals_with_flat_shipping() {
        let lines = [line(1, 1250, 2), line(2, 399, 1)];
        let totals = CartTotals::compute(&lines, Decimal::ZERO, &RULE);
        assert_eq!(totals.subtotal, Decimal::new(2899, 2));
        assert_eq!(totals.shipping, Decimal::new(495, 2));
        assert_eq!(totals.total, Decimal::new(3394, 2));
        assert_eq!(totals.item_count, 3);
    }

    #[test]
    fn test_free_shipping_uses_discounted_amount() {
        let lines = [line(1, 5500, 1)];
        let free = CartTotals::compute(&lines, Decimal::ZERO, &RULE);
        assert_eq!(free.shipping, Decimal::ZERO);

        let discounted = CartTotals::compute(&lines, Decimal::new(1000, 2), &RULE);
        assert_eq!(discounted.shipping, Decimal::new(495, 2));
        assert_eq!(discounted.total, Decimal::new(4995, 2));
    }

    #[test]
    fn test_discount_is_clamped() {
        let lines = [line(1, 1000, 1)];
        let totals = CartTotals::compute(&lines, Decimal::new(5000, 2), &RULE);
        assert_eq!(totals.discount, Decimal::new(1000, 2));
        assert_eq!(totals.total, Decimal::new(495, 2));

        let negative = CartTotals::compute(&lines, Decimal::new(-100, 2), &RULE);
        assert_eq!(negative.discount, Decimal::ZERO);
    }

    #[test]
    fn test_empty_cart_is_free() {
        let totals = CartTotals::compute(&[], Decimal::ZERO, &RULE);
        assert_eq!(totals, CartTotals::default());
    }

    #[test]
    fn test_short_stock() {
        let mut l = line(1, 100, 3);
        l.available = Some(2);
        assert!(l.is_short());
        l.available = None;
        assert!(!l.is_short());
    }

    #[test]
    fn test_remaining_for_free_shipping() {
        assert_eq!(
            RULE.remaining_for_free(Decimal::new(4000, 2)),
            Some(Decimal::new(1000, 2))
        );
        assert_eq!(RULE.remaining_for_free(Decimal::new(5000, 2)), None);
    }
}
