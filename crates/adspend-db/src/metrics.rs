//! Aggregation queries over the `ad_spend` store.

use adspend_core::{MetricsRange, MetricsSnapshot};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::QueryError;

/// Summed measures for a date range, before derivation.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SpendTotalsRow {
    total_spend: Decimal,
    total_conversions: i64,
}

/// Computes the metrics snapshot for an inclusive date range.
///
/// Rows with a NULL business date never match the range predicate, and NULL
/// measures are ignored by `SUM`, so weakened rows contribute nothing rather
/// than poisoning the aggregate. An empty range (including `start > end`)
/// yields zero sums and NULL ratios — not an error.
///
/// This is a stateless read: it observes committed data only and caches
/// nothing.
///
/// # Errors
///
/// Returns [`QueryError`] if the aggregation query fails.
pub async fn get_metrics(
    pool: &PgPool,
    range: MetricsRange,
    revenue_per_conversion: Decimal,
) -> Result<MetricsSnapshot, QueryError> {
    let totals = sqlx::query_as::<_, SpendTotalsRow>(
        "SELECT \
             COALESCE(SUM(spend), 0) AS total_spend, \
             COALESCE(SUM(conversions), 0)::BIGINT AS total_conversions \
         FROM ad_spend \
         WHERE date BETWEEN $1 AND $2",
    )
    .bind(range.start)
    .bind(range.end)
    .fetch_one(pool)
    .await?;

    Ok(MetricsSnapshot::from_totals(
        range,
        totals.total_spend,
        totals.total_conversions,
        revenue_per_conversion,
    ))
}
