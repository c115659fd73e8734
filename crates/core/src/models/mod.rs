//! Records shared by the storefront, the back-office and the CLI.
//!
//! Field names match column names so the binaries can load rows straight
//! into these types with `sqlx::query_as`.

pub mod catalog;
pub mod content;
pub mod customer;
pub mod order;
pub mod review;

pub use catalog::{Category, Combo, ComboItem, Product, Variant, VariantOption, combo_savings};
pub use content::UiConfig;
pub use customer::Customer;
pub use order::{Order, OrderLine, ShippingAddress, ShippingPartner, format_order_number};
pub use review::{RatingSummary, Review};
