//! Storefront-only models.
//!
//! Shop records (products, orders, reviews) live in `jouwwinkel_core::models`;
//! this module holds what only the storefront needs: session state and
//! stored passkeys.

pub mod credential;
pub mod session;

pub use credential::CustomerCredential;
pub use session::{CurrentCustomer, Flash, FlashKind, keys as session_keys};
