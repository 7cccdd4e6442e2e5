use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use adspend_db::IngestError;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

/// Typed ingest request body. The URL must point at a direct-download CSV
/// export carrying the required spend columns.
#[derive(Debug, Deserialize)]
pub(super) struct IngestRequest {
    pub url: String,
    pub source_file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct IngestData {
    pub inserted_rows: i64,
    pub total_rows: i64,
    pub load_date: DateTime<Utc>,
}

pub(super) async fn ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<ApiResponse<IngestData>>, ApiError> {
    let records = state
        .fetcher
        .fetch_record_set(&request.url)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, url = %request.url, "failed to fetch or decode source file");
            ApiError::new(
                req_id.0.clone(),
                "bad_request",
                format!("failed to fetch or decode source file: {e}"),
            )
        })?;

    let receipt = adspend_db::ingest_records(
        &state.pool,
        records,
        request.source_file_name.as_deref(),
    )
    .await
    .map_err(|e| match e {
        IngestError::Schema(schema) => {
            ApiError::new(req_id.0.clone(), "validation_error", schema.to_string())
        }
        IngestError::Load(load) => {
            tracing::error!(error = %load, "spend batch load failed");
            ApiError::new(req_id.0.clone(), "internal_error", "spend batch load failed")
        }
    })?;

    tracing::info!(
        inserted_rows = receipt.inserted_rows,
        total_rows = receipt.total_rows,
        nulled_fields = receipt.nulled_fields,
        url = %request.url,
        "ingested spend batch"
    );

    Ok(Json(ApiResponse {
        data: IngestData {
            inserted_rows: receipt.inserted_rows,
            total_rows: receipt.total_rows,
            load_date: receipt.load_date,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
