//! Back-office models.
//!
//! Shop records come from `jouwwinkel_core::models`; this module holds the
//! admin account and what the session carries.

pub mod admin_user;
pub mod session;

pub use admin_user::{AdminRole, AdminUser};
pub use session::{CurrentAdmin, Flash, FlashKind, keys as session_keys};
