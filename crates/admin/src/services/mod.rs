//! Business logic services for admin.
//!
//! # Services
//!
//! - `auth` - Password sign-in and account creation
//! - `email` - Order e-mails via SMTP
//! - `inventory` - Variant generation and bulk edits
//! - `media` - Image uploads on local disk
//! - `orders` - Status workflow, shipping and payment

pub mod auth;
pub mod email;
pub mod inventory;
pub mod media;
pub mod orders;

pub use auth::{AdminAuthError, AdminAuthService};
pub use email::{EmailError, EmailService};
pub use inventory::InventoryError;
pub use media::{MediaError, MediaStore};
pub use orders::OrderActionError;
