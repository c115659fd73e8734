//! Form validation.
//!
//! Handlers parse raw form strings through a [`ValidationErrors`] collector:
//! every helper records a message for its field on failure and returns a
//! placeholder, so a form reports all of its problems at once.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{Email, Slug};

/// Field name to error messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// First message for a field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|m| m.first())
            .map(String::as_str)
    }

    /// All messages, flattened, for a summary box.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.fields.values().flatten().cloned().collect()
    }

    /// `Ok(value)` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one field failed.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    /// Trimmed text, optionally required, at most `max_len` characters.
    pub fn text(&mut self, field: &str, raw: &str, max_len: usize, required: bool) -> String {
        let value = raw.trim();
        if required && value.is_empty() {
            self.add(field, "This field is required");
        } else if value.chars().count() > max_len {
            self.add(field, format!("Must be at most {max_len} characters"));
        }
        value.to_owned()
    }

    /// Trimmed text or `None` when blank.
    pub fn optional_text(&mut self, field: &str, raw: &str, max_len: usize) -> Option<String> {
        let value = self.text(field, raw, max_len, false);
        (!value.is_empty()).then_some(value)
    }

    /// A non-negative amount with at most two decimals. Accepts `12,50`.
    pub fn money(&mut self, field: &str, raw: &str, allow_zero: bool) -> Decimal {
        let raw = raw.trim();
        if raw.is_empty() {
            self.add(field, "This field is required");
            return Decimal::ZERO;
        }
        match parse_amount(raw) {
            Some(amount) if amount.is_sign_negative() && !amount.is_zero() => {
                self.add(field, "Amount cannot be negative");
                Decimal::ZERO
            }
            Some(amount) if amount.is_zero() && !allow_zero => {
                self.add(field, "Amount must be greater than zero");
                Decimal::ZERO
            }
            Some(amount) if amount.scale() > 2 && amount.normalize().scale() > 2 => {
                self.add(field, "Use at most two decimals");
                Decimal::ZERO
            }
            Some(amount) => amount,
            None => {
                self.add(field, "Enter an amount like 12.50");
                Decimal::ZERO
            }
        }
    }

    /// Blank means `None`; otherwise as [`Self::money`] with zero allowed.
    pub fn optional_money(&mut self, field: &str, raw: &str) -> Option<Decimal> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(self.money(field, raw, true))
        }
    }

    /// A stock count: whole, non-negative.
    pub fn stock(&mut self, field: &str, raw: &str) -> i32 {
        match raw.trim().parse::<i32>() {
            Ok(n) if n >= 0 => n,
            _ => {
                self.add(field, "Enter a whole number of 0 or more");
                0
            }
        }
    }

    /// Blank means `None`; otherwise a whole number of at least `min`.
    pub fn optional_int(&mut self, field: &str, raw: &str, min: i32) -> Option<i32> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<i32>() {
            Ok(n) if n >= min => Some(n),
            _ => {
                self.add(field, format!("Enter a whole number of {min} or more"));
                None
            }
        }
    }

    /// A review rating from 1 to 5.
    pub fn rating(&mut self, field: &str, raw: &str) -> i16 {
        match raw.trim().parse::<i16>() {
            Ok(n) if (1..=5).contains(&n) => n,
            _ => {
                self.add(field, "Choose a rating from 1 to 5");
                0
            }
        }
    }

    /// An `<input type="datetime-local">` (or plain date) value, read as UTC.
    pub fn datetime(&mut self, field: &str, raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let parsed = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            });
        if parsed.is_none() {
            self.add(field, "Enter a date like 2025-06-01T09:00");
        }
        parsed.map(|dt| dt.and_utc())
    }

    pub fn email(&mut self, field: &str, raw: &str) -> Option<Email> {
        match Email::parse(raw) {
            Ok(email) => Some(email),
            Err(e) => {
                self.add(field, capitalise(&e.to_string()));
                None
            }
        }
    }

    /// The given slug, or one derived from `title` when left blank.
    pub fn slug(&mut self, field: &str, raw: &str, title: &str) -> String {
        let raw = raw.trim();
        let result = if raw.is_empty() {
            Slug::from_title(title)
        } else {
            Slug::parse(raw)
        };
        match result {
            Ok(slug) => slug.into(),
            Err(e) => {
                self.add(field, capitalise(&e.to_string()));
                String::new()
            }
        }
    }

    /// Any `FromStr` enum from a select box.
    pub fn choice<T: FromStr + Default>(&mut self, field: &str, raw: &str) -> T {
        raw.trim().parse().unwrap_or_else(|_| {
            self.add(field, "Choose one of the listed options");
            T::default()
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, msgs)| format!("{field}: {}", msgs.join(", ")))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

fn parse_amount(raw: &str) -> Option<Decimal> {
    let cleaned = raw.trim_start_matches('€').trim().replace(',', ".");
    Decimal::from_str(&cleaned).ok()
}

fn capitalise(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Timelike;

    use super::*;
    use crate::types::DiscountType;

    #[test]
    fn test_collects_all_errors() {
        let mut v = ValidationErrors::new();
        let name = v.text("name", "   ", 10, true);
        let price = v.money("price", "abc", false);
        let stock = v.stock("stock", "-1");
        assert_eq!(name, "");
        assert_eq!(price, Decimal::ZERO);
        assert_eq!(stock, 0);
        assert_eq!(v.get("name"), Some("This field is required"));
        assert_eq!(v.messages().len(), 3);
        assert!(v.into_result(()).is_err());
    }

    #[test]
    fn test_money_accepts_comma_and_symbol() {
        let mut v = ValidationErrors::new();
        assert_eq!(v.money("p", "12,50", false), Decimal::new(1250, 2));
        assert_eq!(v.money("p", "€ 3.5", false), Decimal::new(35, 1));
        assert_eq!(v.money("p", "0", true), Decimal::ZERO);
        assert_eq!(v.money("p", "4.000", false), Decimal::new(4, 0));
        assert!(v.is_empty());
    }

    #[test]
    fn test_money_rejections() {
        let mut v = ValidationErrors::new();
        v.money("zero", "0", false);
        v.money("negative", "-1", true);
        v.money("precise", "1.005", true);
        assert!(v.get("zero").is_some());
        assert!(v.get("negative").is_some());
        assert!(v.get("precise").is_some());
        assert_eq!(v.optional_money("blank", " "), None);
    }

    #[test]
    fn test_text_length_counts_characters() {
        let mut v = ValidationErrors::new();
        assert_eq!(v.text("t", " éé ", 2, true), "éé");
        assert!(v.is_empty());
        v.text("t", "ééé", 2, true);
        assert!(v.get("t").is_some());
    }

    #[test]
    fn test_datetime_formats() {
        let mut v = ValidationErrors::new();
        let dt = v.datetime("d", "2025-06-01T09:30").unwrap();
        assert_eq!(dt.hour(), 9);
        assert!(v.datetime("d", "2025-06-01").is_some());
        assert!(v.datetime("d", "").is_none());
        assert!(v.is_empty());
        assert!(v.datetime("d", "tomorrow").is_none());
        assert!(v.get("d").is_some());
    }

    #[test]
    fn test_slug_falls_back_to_title() {
        let mut v = ValidationErrors::new();
        assert_eq!(v.slug("slug", "", "Wollen Sjaal"), "wollen-sjaal");
        assert_eq!(v.slug("slug", "eigen-slug", "Wollen Sjaal"), "eigen-slug");
        v.slug("slug", "Not Valid", "x");
        assert!(v.get("slug").is_some());
    }

    #[test]
    fn test_rating_and_choice() {
        let mut v = ValidationErrors::new();
        assert_eq!(v.rating("r", "4"), 4);
        assert_eq!(v.choice::<DiscountType>("t", "fixed"), DiscountType::Fixed);
        assert!(v.is_empty());
        v.rating("r", "9");
        v.choice::<DiscountType>("t", "free");
        assert_eq!(v.messages().len(), 2);
    }

    #[test]
    fn test_email_message_is_capitalised() {
        let mut v = ValidationErrors::new();
        assert!(v.email("email", "nope").is_none());
        assert_eq!(v.get("email"), Some("Email must contain exactly one @ symbol"));
    }
}
