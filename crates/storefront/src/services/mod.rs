//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Customer authentication (password, `WebAuthn` passkeys)
//! - `cart` - Re-pricing the session cart against the catalog
//! - `checkout` - Placing an order in one transaction
//! - `orders` - Customer order cancellation
//! - `content` - Cached site content and Markdown rendering

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod content;
pub mod orders;
