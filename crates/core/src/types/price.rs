//! Money amounts.
//!
//! All prices are stored as `NUMERIC(10,2)` and handled as [`Decimal`] so
//! cart arithmetic never goes through floating point.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Round an amount to whole cents, half away from zero.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (euros, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A price in the shop currency.
    #[must_use]
    pub fn eur(amount: Decimal) -> Self {
        Self::new(round_money(amount), CurrencyCode::EUR)
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::eur(Decimal::ZERO)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let amount = round_money(self.amount);
        if amount.is_sign_negative() && !amount.is_zero() {
            write!(f, "-{}{:.2}", self.currency_code.symbol(), amount.abs())
        } else {
            write!(f, "{}{:.2}", self.currency_code.symbol(), amount)
        }
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    EUR,
    USD,
    GBP,
}

impl CurrencyCode {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::EUR => "€",
            Self::USD => "$",
            Self::GBP => "£",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_euro() {
        assert_eq!(Price::eur(Decimal::new(125, 1)).to_string(), "€12.50");
        assert_eq!(Price::zero().to_string(), "€0.00");
        assert_eq!(Price::eur(Decimal::new(-31, 1)).to_string(), "-€3.10");
    }

    #[test]
    fn test_round_money_half_away_from_zero() {
        assert_eq!(round_money(Decimal::new(2345, 3)), Decimal::new(235, 2));
        assert_eq!(round_money(Decimal::new(2344, 3)), Decimal::new(234, 2));
        assert_eq!(round_money(Decimal::new(-2345, 3)), Decimal::new(-235, 2));
    }

    #[test]
    fn test_default_currency_is_eur() {
        assert_eq!(CurrencyCode::default(), CurrencyCode::EUR);
        assert!(Price::zero().is_zero());
    }
}
