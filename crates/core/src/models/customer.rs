//! Storefront customer accounts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::ShippingAddress;
use crate::types::{CustomerId, Email};

/// A registered customer with their default shipping details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: CustomerId,
    pub email: Email,
    pub full_name: String,
    pub phone: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Name to show in greetings, falling back to the e-mail local part.
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.full_name.trim();
        if name.is_empty() {
            self.email.as_str().split('@').next().unwrap_or_default()
        } else {
            name
        }
    }

    /// Checkout form defaults.
    #[must_use]
    pub fn default_address(&self) -> ShippingAddress {
        ShippingAddress {
            full_name: self.full_name.clone(),
            phone: self.phone.clone(),
            street: self.street.clone(),
            postal_code: self.postal_code.clone(),
            city: self.city.clone(),
            country: if self.country.is_empty() {
                ShippingAddress::DEFAULT_COUNTRY.to_owned()
            } else {
                self.country.clone()
            },
        }
    }
}
