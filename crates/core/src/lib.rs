//! Jouwwinkel Core - shared domain types and shop arithmetic.
//!
//! Used by every Jouwwinkel component:
//! - `storefront` - Public shop (browsing, cart, checkout, accounts)
//! - `admin` - Back-office (catalog, orders, coupons, site content)
//! - `cli` - Migrations, admin bootstrap, catalog seeding
//!
//! # Architecture
//!
//! No I/O lives here: no database access and no HTTP. Records derive
//! `sqlx::FromRow` behind the `postgres` feature so the binaries can load
//! them directly, but every calculation (cart totals, coupon discounts,
//! variant enumeration, order status transitions) is a pure function that
//! can be tested without a database.
//!
//! The one exception is [`stock`], the ledger of units taken by orders,
//! which is only built with the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, slugs, prices and status enums
//! - [`models`] - Catalog, order, review, customer and site content records
//! - [`cart`] - Session cart and totals
//! - [`coupon`] - Coupon rules and discount application
//! - [`variants`] - Variant option combinations for inventory
//! - [`stock`] - Stock taken by orders and given back on cancellation
//! - [`validation`] - Form field validation helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod coupon;
pub mod models;
#[cfg(feature = "postgres")]
pub mod stock;
pub mod types;
pub mod validation;
pub mod variants;

pub use types::*;
