//! Site content configuration edited in the back-office.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::ShippingRule;

/// Texts, hero block and shipping rule shown across the storefront.
///
/// Stored as a single JSONB document; fields missing from older documents
/// fall back to [`Default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub store_name: String,
    pub tagline: String,
    /// Short banner above the header. Hidden when empty.
    pub announcement: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    pub hero_image_url: Option<String>,
    pub hero_cta_label: String,
    pub hero_cta_url: String,
    /// Markdown for the about page.
    pub about_markdown: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub shipping_fee: Decimal,
    /// Orders at or above this (after discount) ship free.
    pub free_shipping_threshold: Option<Decimal>,
    /// Stock at or below this is flagged on the dashboard.
    pub low_stock_threshold: i32,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            store_name: "Jouwwinkel".to_owned(),
            tagline: "Your neighbourhood shop, online".to_owned(),
            announcement: String::new(),
            hero_title: "New this season".to_owned(),
            hero_subtitle: "Hand-picked products, shipped within two working days.".to_owned(),
            hero_image_url: None,
            hero_cta_label: "Shop now".to_owned(),
            hero_cta_url: "/products".to_owned(),
            about_markdown: "We are a small independent shop.".to_owned(),
            contact_email: "hello@jouwwinkel.nl".to_owned(),
            contact_phone: String::new(),
            shipping_fee: Decimal::new(495, 2),
            free_shipping_threshold: Some(Decimal::new(5000, 2)),
            low_stock_threshold: 5,
        }
    }
}

impl UiConfig {
    #[must_use]
    pub const fn shipping_rule(&self) -> ShippingRule {
        ShippingRule {
            flat_fee: self.shipping_fee,
            free_threshold: self.free_shipping_threshold,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_document_uses_defaults() {
        let cfg: UiConfig =
            serde_json::from_str(r#"{"store_name":"Bakkerij Jansen","shipping_fee":"3.95"}"#)
                .unwrap();
        assert_eq!(cfg.store_name, "Bakkerij Jansen");
        assert_eq!(cfg.shipping_fee, Decimal::new(395, 2));
        assert_eq!(cfg.low_stock_threshold, 5);
        assert_eq!(cfg.hero_cta_url, "/products");
    }

    #[test]
    fn test_shipping_rule_from_config() {
        let rule = UiConfig::default().shipping_rule();
        assert_eq!(rule.flat_fee, Decimal::new(495, 2));
        assert_eq!(rule.free_threshold, Some(Decimal::new(5000, 2)));
    }
}
