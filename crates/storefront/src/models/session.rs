//! Session-related types.
//!
//! Types stored in the session for authentication state and the cart.

use serde::{Deserialize, Serialize};

use jouwwinkel_core::models::Customer;
use jouwwinkel_core::{CustomerId, Email};

/// Session-stored customer identity.
///
/// Minimal data stored in the session to identify the signed-in customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer's database ID.
    pub id: CustomerId,
    /// Customer's email address.
    pub email: Email,
    /// Name shown in the header; falls back to the email.
    pub name: String,
}

impl From<&Customer> for CurrentCustomer {
    fn from(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            email: customer.email.clone(),
            name: customer.full_name.clone(),
        }
    }
}

impl CurrentCustomer {
    #[must_use]
    pub fn greeting_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.email.as_str()
        } else {
            &self.name
        }
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// CSS modifier for the alert box.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Success => "alert-success",
            FlashKind::Error => "alert-error",
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current signed-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for `WebAuthn` registration challenge state.
    pub const WEBAUTHN_REG: &str = "webauthn_reg";

    /// Key for `WebAuthn` authentication challenge state.
    pub const WEBAUTHN_AUTH: &str = "webauthn_auth";

    /// Key for the session cart.
    pub const CART: &str = "cart";

    /// Path to return to after signing in.
    pub const RETURN_TO: &str = "return_to";

    /// One-shot flash message.
    pub const FLASH: &str = "flash";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_greeting_name_falls_back_to_email() {
        let mut customer = CurrentCustomer {
            id: CustomerId::new(1),
            email: Email::parse("anna@jouwwinkel.nl").unwrap(),
            name: "  ".to_string(),
        };
        assert_eq!(customer.greeting_name(), "anna@jouwwinkel.nl");
        customer.name = "Anna de Vries".to_string();
        assert_eq!(customer.greeting_name(), "Anna de Vries");
    }

    #[test]
    fn test_flash_round_trips_through_json() {
        let flash = Flash::error("Coupon expired");
        let json = serde_json::to_string(&flash).unwrap();
        assert!(json.contains("\"error\""));
        let back: Flash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flash);
        assert_eq!(back.css_class(), "alert-error");
    }
}
