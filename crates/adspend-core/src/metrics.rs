//! Date-range resolution and metric derivation.
//!
//! The aggregation query lives in the database crate; this module holds the
//! pure arithmetic so the null-safety rules are testable without a store.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inclusive date range for a metrics query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MetricsRange {
    /// Resolves caller-supplied bounds to a concrete range.
    ///
    /// A missing `end` defaults to `today`; a missing `start` defaults to
    /// `end − 29` days (a 30-day window). A range with `start > end` is
    /// returned as-is: it matches no rows and aggregates to the empty
    /// snapshot rather than erroring.
    #[must_use]
    pub fn resolve(start: Option<NaiveDate>, end: Option<NaiveDate>, today: NaiveDate) -> Self {
        let end = end.unwrap_or(today);
        let start = start.unwrap_or_else(|| end.checked_sub_days(Days::new(29)).unwrap_or(end));
        Self { start, end }
    }
}

/// Aggregated KPIs over a date range. Computed fresh per query, never
/// persisted or cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_spend: Decimal,
    pub total_conversions: i64,
    pub total_revenue: Decimal,
    /// Cost to acquire: spend / conversions. `None` when there are no
    /// conversions in range, regardless of spend.
    pub cac: Option<Decimal>,
    /// Return on ad spend: revenue / spend. `None` when there is no spend
    /// in range, regardless of revenue.
    pub roas: Option<Decimal>,
}

impl MetricsSnapshot {
    /// Derives the snapshot from the summed totals of a range.
    ///
    /// Revenue is the named heuristic `conversions × revenue_per_conversion`
    /// (the store carries no revenue column); the multiplier comes from
    /// configuration, never a hard-coded default. Both ratios divide
    /// null-safely: a zero denominator yields `None`, not an error.
    #[must_use]
    pub fn from_totals(
        range: MetricsRange,
        total_spend: Decimal,
        total_conversions: i64,
        revenue_per_conversion: Decimal,
    ) -> Self {
        let total_revenue = Decimal::from(total_conversions) * revenue_per_conversion;
        let cac = if total_conversions > 0 {
            total_spend.checked_div(Decimal::from(total_conversions))
        } else {
            None
        };
        let roas = if total_spend > Decimal::ZERO {
            total_revenue.checked_div(total_spend)
        } else {
            None
        };
        Self {
            start: range.start,
            end: range.end,
            total_spend,
            total_conversions,
            total_revenue,
            cac,
            roas,
        }
    }
}
