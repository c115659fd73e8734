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

/// Returns the content hash of `main.css`, computed by the build script.
///
/// Usage in templates: `{{ ""|css_hash }}`
#[askama::filter_fn]
pub fn css_hash(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(env!("CSS_HASH"))
}

/// Formats an amount as euros.
///
/// Usage in templates: `{{ product.price|money }}` renders `€12.50`.
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_money(&value.to_string()))
}

/// Renders a 1-5 rating as filled and empty stars.
///
/// Usage in templates: `{{ review.rating|stars }}`
#[askama::filter_fn]
pub fn stars(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_stars(&value.to_string()))
}

fn format_money(raw: &str) -> String {
    raw.parse::<Decimal>()
        .map_or_else(|_| raw.to_owned(), |amount| Price::eur(amount).to_string())
}

fn format_stars(raw: &str) -> String {
    let filled = raw
        .parse::<f64>()
        .map_or(0, |r| r.round().clamp(0.0, 5.0) as usize);
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("12.5"), "€12.50");
        assert_eq!(format_money("0"), "€0.00");
        assert_eq!(format_money("n/a"), "n/a");
    }

    #[test]
    fn test_format_stars() {
        assert_eq!(format_stars("4"), "★★★★☆");
        assert_eq!(format_stars("3.6"), "★★★★☆");
        assert_eq!(format_stars("9"), "★★★★★");
        assert_eq!(format_stars("x"), "☆☆☆☆☆");
    }
}
