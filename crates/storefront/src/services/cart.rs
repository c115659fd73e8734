//! Cart pricing.
//!
//! The session cart only holds references. Every view re-reads the catalog
//! and turns entries into [`PricedLine`]s; entries that can no longer be sold
//! are dropped from the cart.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgConnection;

use jouwwinkel_core::cart::{Cart, CartItem, CartTotals, PricedLine, ShippingRule};
use jouwwinkel_core::coupon::{Coupon, CouponError};
use jouwwinkel_core::models::{Combo, ComboItem, Product, Variant};
use jouwwinkel_core::{ComboId, ProductId, VariantId};

use crate::db::{RepositoryError, catalog, combos, coupons};

/// Current catalog rows for everything a cart references.
#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    pub products: HashMap<ProductId, Product>,
    pub variants: HashMap<VariantId, Variant>,
    /// Products that are only sold through a variant.
    pub with_variants: HashSet<ProductId>,
    pub combos: HashMap<ComboId, Combo>,
    pub combo_items: HashMap<ComboId, Vec<ComboItem>>,
}

impl CatalogSnapshot {
    /// Load the rows a cart needs, combo components included.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn load(conn: &mut PgConnection, cart: &Cart) -> Result<Self, RepositoryError> {
        let mut product_ids = Vec::new();
        let mut variant_ids = Vec::new();
        let mut combo_ids = Vec::new();
        for entry in cart.entries() {
            match entry.item {
                CartItem::Product {
                    product_id,
                    variant_id,
                } => {
                    product_ids.push(product_id);
                    variant_ids.extend(variant_id);
                }
                CartItem::Combo { combo_id } => combo_ids.push(combo_id),
            }
        }

        let combo_rows = combos::combos_by_ids(&mut *conn, &combo_ids).await?;
        let item_rows = combos::items_for(&mut *conn, &combo_ids).await?;
        product_ids.extend(item_rows.iter().map(|i| i.product_id));
        product_ids.sort_unstable_by_key(ProductId::as_i32);
        product_ids.dedup();

        let products = catalog::products_by_ids(&mut *conn, &product_ids).await?;
        let variants = catalog::variants_by_ids(&mut *conn, &variant_ids).await?;
        let with_variants = catalog::products_with_variants(&mut *conn, &product_ids).await?;

        let mut combo_items: HashMap<ComboId, Vec<ComboItem>> = HashMap::new();
        for item in item_rows {
            combo_items.entry(item.combo_id).or_default().push(item);
        }

        Ok(Self {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            variants: variants.into_iter().map(|v| (v.id, v)).collect(),
            with_variants,
            combos: combo_rows.into_iter().map(|c| (c.id, c)).collect(),
            combo_items,
        })
    }

    /// An active product that can be bought without choosing a variant.
    fn plain_product(&self, id: ProductId) -> Option<&Product> {
        self.products
            .get(&id)
            .filter(|p| p.is_active && !self.with_variants.contains(&id))
    }

    /// Price one cart entry, or `None` when it can no longer be sold.
    fn price(&self, item: CartItem, quantity: u32) -> Option<PricedLine> {
        match item {
            CartItem::Product {
                product_id,
                variant_id: None,
            } => {
                let product = self.plain_product(product_id)?;
                Some(PricedLine {
                    item,
                    title: product.name.clone(),
                    slug: product.slug.clone(),
                    variant_label: None,
                    image_url: product.primary_image().map(str::to_owned),
                    unit_price: product.price,
                    quantity,
                    available: Some(units(product.stock)),
                })
            }
            CartItem::Product {
                product_id,
                variant_id: Some(variant_id),
            } => {
                let product = self.products.get(&product_id).filter(|p| p.is_active)?;
                let variant = self
                    .variants
                    .get(&variant_id)
                    .filter(|v| v.product_id == product_id)?;
                Some(PricedLine {
                    item,
                    title: product.name.clone(),
                    slug: product.slug.clone(),
                    variant_label: Some(variant.label()),
                    image_url: product.primary_image().map(str::to_owned),
                    unit_price: variant.unit_price(product),
                    quantity,
                    available: Some(units(variant.stock)),
                })
            }
            CartItem::Combo { combo_id } => {
                let combo = self.combos.get(&combo_id).filter(|c| c.is_active)?;
                let items = self.combo_items.get(&combo_id).filter(|i| !i.is_empty())?;
                let mut available = u32::MAX;
                for component in items {
                    let product = self.plain_product(component.product_id)?;
                    let per_combo = u32::try_from(component.quantity).ok().filter(|q| *q > 0)?;
                    available = available.min(units(product.stock) / per_combo);
                }
                Some(PricedLine {
                    item,
                    title: combo.name.clone(),
                    slug: combo.slug.clone(),
                    variant_label: None,
                    image_url: combo.image_url.clone(),
                    unit_price: combo.price,
                    quantity,
                    available: Some(available),
                })
            }
        }
    }
}

fn units(stock: i32) -> u32 {
    u32::try_from(stock).unwrap_or(0)
}

/// Price every cart entry against a snapshot.
///
/// Returns the sellable lines in cart order and the items that had to be
/// dropped.
#[must_use]
pub fn build_lines(cart: &Cart, snapshot: &CatalogSnapshot) -> (Vec<PricedLine>, Vec<CartItem>) {
    let mut lines = Vec::with_capacity(cart.entries().len());
    let mut dropped = Vec::new();
    for entry in cart.entries() {
        match snapshot.price(entry.item, entry.quantity) {
            Some(line) => lines.push(line),
            None => dropped.push(entry.item),
        }
    }
    (lines, dropped)
}

/// A cart ready for display.
#[derive(Debug, Clone, Default)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    /// Entries removed because they can no longer be sold.
    pub dropped: usize,
    /// The coupon counted in the totals.
    pub coupon: Option<Coupon>,
    /// Why the cart's coupon code is not counted.
    pub coupon_error: Option<CouponError>,
    pub totals: CartTotals,
    pub free_shipping_remaining: Option<Decimal>,
}

impl PricedCart {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The first line asking for more than is in stock.
    #[must_use]
    pub fn short_line(&self) -> Option<&PricedLine> {
        self.lines.iter().find(|l| l.is_short())
    }
}

/// Discount for the cart's coupon code, or the reason it does not apply.
fn apply_coupon(
    coupon: Option<Coupon>,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<(Coupon, Decimal), CouponError> {
    let coupon = coupon.ok_or(CouponError::Unknown)?;
    let discount = coupon.discount_for(subtotal, now)?;
    Ok((coupon, discount))
}

/// Re-price the session cart.
///
/// Unsellable entries are removed from `cart`. A coupon that no longer
/// applies stays in the cart but is reported and left out of the totals.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn price_cart(
    conn: &mut PgConnection,
    cart: &mut Cart,
    rule: &ShippingRule,
    now: DateTime<Utc>,
) -> Result<PricedCart, RepositoryError> {
    let snapshot = CatalogSnapshot::load(&mut *conn, cart).await?;
    let (lines, dropped) = build_lines(cart, &snapshot);
    if !dropped.is_empty() {
        cart.retain(|item| !dropped.contains(item));
        tracing::debug!(dropped = dropped.len(), "Dropped unsellable cart entries");
    }

    let subtotal: Decimal = lines.iter().map(PricedLine::line_total).sum();
    let (coupon, coupon_error, discount) = match cart.coupon_code() {
        Some(code) if !lines.is_empty() => {
            let found = coupons::by_code(&mut *conn, code).await?;
            match apply_coupon(found, subtotal, now) {
                Ok((coupon, discount)) => (Some(coupon), None, discount),
                Err(e) => (None, Some(e), Decimal::ZERO),
            }
        }
        _ => (None, None, Decimal::ZERO),
    };

    let totals = CartTotals::compute(&lines, discount, rule);
    let free_shipping_remaining = if lines.is_empty() {
        None
    } else {
        rule.remaining_for_free(totals.subtotal - totals.discount)
    };

    Ok(PricedCart {
        lines,
        dropped: dropped.len(),
        coupon,
        coupon_error,
        totals,
        free_shipping_remaining,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use jouwwinkel_core::{CategoryId, CouponId, DiscountType};

    use super::*;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn product(id: i32, cents: i64, stock: i32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: Some(CategoryId::new(1)),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            price: Decimal::new(cents, 2),
            compare_at_price: None,
            stock,
            image_urls: vec![format!("/media/{id}.jpg")],
            is_featured: false,
            is_active: true,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn variant(id: i32, product_id: i32, stock: i32) -> Variant {
        Variant {
            id: VariantId::new(id),
            product_id: ProductId::new(product_id),
            option_values: vec!["Red".to_owned(), "M".to_owned()],
            sku: None,
            price_override: Some(Decimal::new(1500, 2)),
            stock,
        }
    }

    fn combo(id: i32, cents: i64) -> Combo {
        Combo {
            id: ComboId::new(id),
            name: format!("Combo {id}"),
            slug: format!("combo-{id}"),
            description: String::new(),
            image_url: None,
            price: Decimal::new(cents, 2),
            is_active: true,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    fn snapshot() -> CatalogSnapshot {
        let mut snap = CatalogSnapshot::default();
        for p in [product(1, 1000, 5), product(2, 2000, 7), product(3, 500, 9)] {
            snap.products.insert(p.id, p);
        }
        snap.with_variants.insert(ProductId::new(2));
        snap.variants.insert(VariantId::new(10), variant(10, 2, 3));
        snap.combos.insert(ComboId::new(1), combo(1, 1800));
        snap.combo_items.insert(
            ComboId::new(1),
            vec![
                ComboItem {
                    combo_id: ComboId::new(1),
                    product_id: ProductId::new(1),
                    quantity: 2,
                },
                ComboItem {
                    combo_id: ComboId::new(1),
                    product_id: ProductId::new(3),
                    quantity: 1,
                },
            ],
        );
        snap
    }

    #[test]
    fn test_plain_product_line() {
        let mut cart = Cart::new();
        cart.add(CartItem::product(ProductId::new(1), None), 2);
        let (lines, dropped) = build_lines(&cart, &snapshot());
        assert!(dropped.is_empty());
        assert_eq!(lines[0].unit_price, Decimal::new(1000, 2));
        assert_eq!(lines[0].available, Some(5));
        assert_eq!(lines[0].image_url.as_deref(), Some("/media/1.jpg"));
    }

    #[test]
    fn test_variant_line_uses_override_and_variant_stock() {
        let mut cart = Cart::new();
        cart.add(
            CartItem::product(ProductId::new(2), Some(VariantId::new(10))),
            1,
        );
        let (lines, _) = build_lines(&cart, &snapshot());
        assert_eq!(lines[0].unit_price, Decimal::new(1500, 2));
        assert_eq!(lines[0].available, Some(3));
        assert_eq!(lines[0].variant_label.as_deref(), Some("Red / M"));
    }

    #[test]
    fn test_product_with_variants_needs_a_variant() {
        let mut cart = Cart::new();
        let item = CartItem::product(ProductId::new(2), None);
        cart.add(item, 1);
        let (lines, dropped) = build_lines(&cart, &snapshot());
        assert!(lines.is_empty());
        assert_eq!(dropped, vec![item]);
    }

    #[test]
    fn test_variant_of_another_product_is_dropped() {
        let mut cart = Cart::new();
        cart.add(
            CartItem::product(ProductId::new(1), Some(VariantId::new(10))),
            1,
        );
        let (lines, dropped) = build_lines(&cart, &snapshot());
        assert!(lines.is_empty());
        assert_eq!(dropped.len(), 1);
    }

    #[test]
    fn test_inactive_and_missing_items_are_dropped() {
        let mut snap = snapshot();
        snap.products.get_mut(&ProductId::new(3)).unwrap().is_active = false;

        let mut cart = Cart::new();
        cart.add(CartItem::product(ProductId::new(3), None), 1);
        cart.add(CartItem::product(ProductId::new(99), None), 1);
        cart.add(CartItem::product(ProductId::new(1), None), 1);

        let (lines, dropped) = build_lines(&cart, &snap);
        assert_eq!(lines.len(), 1);
        assert_eq!(dropped.len(), 2);
    }

    #[test]
    fn test_combo_availability_is_limited_by_components() {
        let mut cart = Cart::new();
        cart.add(CartItem::combo(ComboId::new(1)), 1);
        let (lines, _) = build_lines(&cart, &snapshot());
        // product 1: 5 in stock, 2 per combo
        assert_eq!(lines[0].available, Some(2));
        assert_eq!(lines[0].unit_price, Decimal::new(1800, 2));
    }

    #[test]
    fn test_combo_with_inactive_component_is_dropped() {
        let mut snap = snapshot();
        snap.products.get_mut(&ProductId::new(3)).unwrap().is_active = false;
        let mut cart = Cart::new();
        cart.add(CartItem::combo(ComboId::new(1)), 1);
        let (lines, dropped) = build_lines(&cart, &snap);
        assert!(lines.is_empty());
        assert_eq!(dropped.len(), 1);
    }

    #[test]
    fn test_negative_stock_reads_as_zero() {
        let mut snap = snapshot();
        snap.products.get_mut(&ProductId::new(1)).unwrap().stock = -4;
        let mut cart = Cart::new();
        cart.add(CartItem::product(ProductId::new(1), None), 1);
        let (lines, _) = build_lines(&cart, &snap);
        assert_eq!(lines[0].available, Some(0));
        assert!(lines[0].is_short());
    }

    #[test]
    fn test_apply_coupon() {
        let coupon = Coupon {
            id: CouponId::new(1),
            code: "WELKOM10".to_owned(),
            description: String::new(),
            discount_type: DiscountType::Percentage,
            value: Decimal::new(10, 0),
            min_order_amount: None,
            max_discount: None,
            usage_limit: None,
            times_used: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: ts(),
        };
        let (_, discount) = apply_coupon(Some(coupon), Decimal::new(5000, 2), ts()).unwrap();
        assert_eq!(discount, Decimal::new(500, 2));
        assert_eq!(
            apply_coupon(None, Decimal::ONE, ts()).unwrap_err(),
            CouponError::Unknown
        );
    }
}
