//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use jouwwinkel_core::Price;
use rust_decimal::Decimal;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount as euros.
///
/// Usage in templates: `{{ order.total|money }}` renders `€12.50`.
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let raw = value.to_string();
    Ok(raw
        .parse::<Decimal>()
        .map_or(raw, |amount| Price::eur(amount).to_string()))
}

/// Timestamp in the short form used across tables: `01-03-2026 14:05`.
#[must_use]
pub fn short_datetime(at: &chrono::DateTime<chrono::Utc>) -> String {
    at.format("%d-%m-%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_short_datetime() {
        let at = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 14, 5, 0).single();
        assert_eq!(at.map(|at| short_datetime(&at)).as_deref(), Some("01-03-2026 14:05"));
    }
}
