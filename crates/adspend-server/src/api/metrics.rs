use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use adspend_core::{MetricsRange, MetricsSnapshot};

use crate::middleware::RequestId;

use super::{map_query_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Optional inclusive bounds; a missing `end` defaults to today and a
/// missing `start` to a 30-day window before `end`.
#[derive(Debug, Deserialize)]
pub(super) struct MetricsQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(super) struct MetricsData {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub spend: Decimal,
    pub conversions: i64,
    pub revenue: Decimal,
    pub cac: Option<Decimal>,
    pub roas: Option<Decimal>,
}

impl From<MetricsSnapshot> for MetricsData {
    fn from(snapshot: MetricsSnapshot) -> Self {
        Self {
            start: snapshot.start,
            end: snapshot.end,
            spend: snapshot.total_spend,
            conversions: snapshot.total_conversions,
            revenue: snapshot.total_revenue,
            cac: snapshot.cac,
            roas: snapshot.roas,
        }
    }
}

pub(super) async fn get_metrics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<ApiResponse<MetricsData>>, ApiError> {
    let range = MetricsRange::resolve(query.start, query.end, Utc::now().date_naive());

    let snapshot = adspend_db::get_metrics(&state.pool, range, state.revenue_per_conversion)
        .await
        .map_err(|e| map_query_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: MetricsData::from(snapshot),
        meta: ResponseMeta::new(req_id.0),
    }))
}
