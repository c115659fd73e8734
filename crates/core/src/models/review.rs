//! Product reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{CustomerId, ProductId, ReviewId, ReviewStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub customer_id: Option<CustomerId>,
    pub author_name: String,
    /// 1 to 5.
    pub rating: i16,
    pub title: String,
    pub body: String,
    pub status: ReviewStatus,
    /// The author had a delivered order containing the product.
    pub verified_purchase: bool,
    pub created_at: DateTime<Utc>,
}

/// Average rating over approved reviews.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RatingSummary {
    pub count: u32,
    /// Rounded to one decimal; zero when there are no reviews.
    pub average: Decimal,
}

impl RatingSummary {
    /// Summarise a set of 1-5 ratings.
    pub fn from_ratings(ratings: impl IntoIterator<Item = i16>) -> Self {
        let (count, sum) = ratings
            .into_iter()
            .filter(|r| (1..=5).contains(r))
            .fold((0u32, 0i64), |(n, s), r| (n + 1, s + i64::from(r)));
        if count == 0 {
            return Self::default();
        }
        let average = (Decimal::from(sum) / Decimal::from(count)).round_dp(1);
        Self { count, average }
    }

    /// Number of filled stars (0-5) for the rounded average.
    #[must_use]
    pub fn stars(&self) -> u8 {
        use rust_decimal::prelude::ToPrimitive;
        self.average.round().to_u8().unwrap_or(0).min(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_summary() {
        let summary = RatingSummary::from_ratings([5, 4, 4]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.average, Decimal::new(43, 1));
        assert_eq!(summary.stars(), 4);
    }

    #[test]
    fn test_rating_summary_ignores_out_of_range() {
        let summary = RatingSummary::from_ratings([0, 6, 3]);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.average, Decimal::new(3, 0));
    }

    #[test]
    fn test_empty_summary() {
        let summary = RatingSummary::from_ratings(std::iter::empty());
        assert_eq!(summary, RatingSummary::default());
        assert_eq!(summary.stars(), 0);
    }
}
