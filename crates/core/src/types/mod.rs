//! Core value types for Jouwwinkel.

pub mod email;
pub mod id;
pub mod price;
pub mod slug;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price, round_money};
pub use slug::{Slug, SlugError};
pub use status::*;
