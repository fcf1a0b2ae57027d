//! Record Routes
//!
//! - POST /api/v1/records - Batch of clinical records
//!
//! Accepted records are written to the store and a change signal is
//! published, which rebuilds the event index.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{BatchError, IngestRecordsRequest, IngestRecordsResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::store::ClinicalRecord;

const MAX_BATCH: usize = 10_000;

/// POST /api/v1/records
pub async fn ingest_records(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRecordsRequest>,
) -> ApiResult<(StatusCode, Json<IngestRecordsResponse>)> {
    if req.records.is_empty() {
        return Err(ApiError::Validation("Empty batch".to_string()));
    }
    if req.records.len() > MAX_BATCH {
        return Err(ApiError::Validation(format!(
            "Batch size exceeds maximum of {} records",
            MAX_BATCH
        )));
    }

    let mut accepted = Vec::with_capacity(req.records.len());
    let mut errors = Vec::new();

    for (index, mut record) in req.records.into_iter().enumerate() {
        if record.user_id.is_empty() {
            record.user_id = state.user_id.to_string();
        }
        match validate_record(&record) {
            Ok(()) => accepted.push(record),
            Err(e) => errors.push(BatchError {
                index,
                error: e.to_string(),
            }),
        }
    }

    let written = if accepted.is_empty() {
        0
    } else {
        let written = state.store.insert(&accepted).await?;
        state.notifier.notify();
        written
    };

    let status = if errors.is_empty() {
        StatusCode::CREATED
    } else if written > 0 {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::BAD_REQUEST
    };

    let status_str = if errors.is_empty() { "ok" } else { "partial" };

    Ok((
        status,
        Json(IngestRecordsResponse {
            status: status_str.to_string(),
            accepted: written,
            rejected: errors.len(),
            errors,
        }),
    ))
}

/// Validate one incoming record
fn validate_record(record: &ClinicalRecord) -> ApiResult<()> {
    if record.id.trim().is_empty() {
        return Err(ApiError::Validation("Record id cannot be empty".to_string()));
    }
    if record.id.len() > 200 {
        return Err(ApiError::Validation(
            "Record id exceeds maximum length of 200 characters".to_string(),
        ));
    }

    let now = Utc::now().timestamp_millis();
    let one_year_ms = 365 * 24 * 60 * 60 * 1000_i64;
    if record.timestamp < now - one_year_ms * 30 {
        return Err(ApiError::Validation(
            "Timestamp is more than 30 years in the past".to_string(),
        ));
    }
    if record.timestamp > now + one_year_ms {
        return Err(ApiError::Validation(
            "Timestamp is more than 1 year in the future".to_string(),
        ));
    }
    Ok(())
}
