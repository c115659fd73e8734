//! Coupons and discount application.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CouponId, DiscountType, round_money};
use crate::validation::ValidationErrors;

/// Longest accepted coupon code.
pub const MAX_CODE_LENGTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: CouponId,
    /// Upper-case, unique.
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    /// Percentage (0-100] or a fixed amount in euros.
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    /// Cap for percentage discounts.
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub times_used: i32,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Why a coupon does not apply to a cart.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponError {
    #[error("this coupon code does not exist")]
    Unknown,
    #[error("this coupon is no longer active")]
    Inactive,
    #[error("this coupon is not valid yet")]
    NotStarted,
    #[error("this coupon has expired")]
    Expired,
    #[error("this coupon has been used up")]
    UsageLimitReached,
    #[error("this coupon requires a minimum order of €{minimum:.2}")]
    MinimumNotMet { minimum: Decimal },
}

impl Coupon {
    /// Check every rule in a fixed order and report the first failure.
    ///
    /// # Errors
    ///
    /// Returns the [`CouponError`] for the first rule that fails.
    pub fn check(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), CouponError> {
        if !self.is_active {
            return Err(CouponError::Inactive);
        }
        if self.starts_at.is_some_and(|starts| now < starts) {
            return Err(CouponError::NotStarted);
        }
        if self.expires_at.is_some_and(|expires| now >= expires) {
            return Err(CouponError::Expired);
        }
        if self.usage_limit.is_some_and(|limit| self.times_used >= limit) {
            return Err(CouponError::UsageLimitReached);
        }
        if let Some(minimum) = self.min_order_amount
            && subtotal < minimum
        {
            return Err(CouponError::MinimumNotMet { minimum });
        }
        Ok(())
    }

    /// Discount this coupon gives on `subtotal`, clamped to `[0, subtotal]`
    /// and rounded to cents.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponError`] when the coupon does not apply.
    pub fn discount_for(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<Decimal, CouponError> {
        self.check(subtotal, now)?;

        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = subtotal * self.value / Decimal::ONE_HUNDRED;
                self.max_discount.map_or(pct, |cap| pct.min(cap))
            }
            DiscountType::Fixed => self.value,
        };

        Ok(round_money(raw.clamp(Decimal::ZERO, subtotal.max(Decimal::ZERO))))
    }

    /// Short human description, e.g. `10% off` or `€5.00 off`.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.discount_type {
            DiscountType::Percentage => format!("{}% off", self.value.normalize()),
            DiscountType::Fixed => format!("€{:.2} off", self.value),
        }
    }
}

/// Normalise a customer-typed code for lookup.
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Coupon fields as entered in the back-office, before saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponTerms {
    pub code: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Reject coupon settings that could never apply or would misbehave.
///
/// # Errors
///
/// Returns the collected field errors.
pub fn validate_coupon_terms(terms: &CouponTerms) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let code = terms.code.as_str();
    if code.is_empty() {
        errors.add("code", "Code is required");
    } else if code.len() > MAX_CODE_LENGTH {
        errors.add("code", format!("Code must be at most {MAX_CODE_LENGTH} characters"));
    } else if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        errors.add("code", "Code may only contain A-Z, 0-9, - and _");
    }

    if terms.value <= Decimal::ZERO {
        errors.add("value", "Value must be greater than zero");
    } else if terms.discount_type == DiscountType::Percentage && terms.value > Decimal::ONE_HUNDRED {
        errors.add("value", "A percentage cannot exceed 100");
    }

    if terms.min_order_amount.is_some_and(|m| m < Decimal::ZERO) {
        errors.add("min_order_amount", "Minimum order cannot be negative");
    }
    if terms.max_discount.is_some_and(|m| m <= Decimal::ZERO) {
        errors.add("max_discount", "Maximum discount must be greater than zero");
    }
    if terms.usage_limit.is_some_and(|l| l < 1) {
        errors.add("usage_limit", "Usage limit must be at least 1");
    }
    if let (Some(starts), Some(expires)) = (terms.starts_at, terms.expires_at)
        && expires <= starts
    {
        errors.add("expires_at", "Expiry must be after the start date");
    }

    errors.into_result(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn coupon(discount_type: DiscountType, value: i64) -> Coupon {
        Coupon {
            id: CouponId::new(1),
            code: "ZOMER".to_owned(),
            description: String::new(),
            discount_type,
            value: Decimal::new(value, 2),
            min_order_amount: None,
            max_discount: None,
            usage_limit: None,
            times_used: 0,
            starts_at: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn eur(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn test_percentage_discount() {
        let c = coupon(DiscountType::Percentage, 1500);
        assert_eq!(c.discount_for(eur(4000), Utc::now()).unwrap(), eur(600));
        // 15% of 33.33 = 4.9995 -> 5.00
        assert_eq!(c.discount_for(eur(3333), Utc::now()).unwrap(), eur(500));
    }

    #[test]
    fn test_percentage_discount_is_capped() {
        let mut c = coupon(DiscountType::Percentage, 5000);
        c.max_discount = Some(eur(1000));
        assert_eq!(c.discount_for(eur(10000), Utc::now()).unwrap(), eur(1000));
        assert_eq!(c.discount_for(eur(1000), Utc::now()).unwrap(), eur(500));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        let c = coupon(DiscountType::Fixed, 2500);
        assert_eq!(c.discount_for(eur(8000), Utc::now()).unwrap(), eur(2500));
        assert_eq!(c.discount_for(eur(1200), Utc::now()).unwrap(), eur(1200));
    }

    #[test]
    fn test_rule_order() {
        let now = Utc::now();
        let mut c = coupon(DiscountType::Fixed, 500);
        c.is_active = false;
        c.expires_at = Some(now - Duration::days(1));
        assert_eq!(c.check(eur(100), now), Err(CouponError::Inactive));

        c.is_active = true;
        assert_eq!(c.check(eur(100), now), Err(CouponError::Expired));

        c.expires_at = None;
        c.starts_at = Some(now + Duration::hours(1));
        assert_eq!(c.check(eur(100), now), Err(CouponError::NotStarted));

        c.starts_at = None;
        c.usage_limit = Some(3);
        c.times_used = 3;
        assert_eq!(c.check(eur(100), now), Err(CouponError::UsageLimitReached));

        c.usage_limit = None;
        c.min_order_amount = Some(eur(2000));
        assert_eq!(
            c.check(eur(1999), now),
            Err(CouponError::MinimumNotMet { minimum: eur(2000) })
        );
        assert!(c.check(eur(2000), now).is_ok());
    }

    #[test]
    fn test_expiry_is_exclusive() {
        let now = Utc::now();
        let mut c = coupon(DiscountType::Fixed, 500);
        c.expires_at = Some(now);
        assert_eq!(c.check(eur(100), now), Err(CouponError::Expired));
    }

    #[test]
    fn test_summary() {
        assert_eq!(coupon(DiscountType::Percentage, 1000).summary(), "10% off");
        assert_eq!(coupon(DiscountType::Fixed, 500).summary(), "€5.00 off");
        assert_eq!(
            CouponError::MinimumNotMet { minimum: eur(2000) }.to_string(),
            "this coupon requires a minimum order of €20.00"
        );
    }

    fn terms() -> CouponTerms {
        CouponTerms {
            code: "WELKOM-10".to_owned(),
            discount_type: DiscountType::Percentage,
            value: Decimal::from(10),
            min_order_amount: None,
            max_discount: None,
            usage_limit: None,
            starts_at: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_validate_terms_accepts_sane_coupon() {
        assert!(validate_coupon_terms(&terms()).is_ok());
    }

    #[test]
    fn test_validate_terms_collects_errors() {
        let now = Utc::now();
        let bad = CouponTerms {
            code: "welkom 10".to_owned(),
            value: Decimal::from(150),
            usage_limit: Some(0),
            starts_at: Some(now),
            expires_at: Some(now - Duration::days(1)),
            ..terms()
        };
        let errors = validate_coupon_terms(&bad).unwrap_err();
        assert!(errors.get("code").is_some());
        assert!(errors.get("value").is_some());
        assert!(errors.get("usage_limit").is_some());
        assert!(errors.get("expires_at").is_some());
        assert!(errors.get("max_discount").is_none());
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  welkom-10\t"), "WELKOM-10");
    }
}
