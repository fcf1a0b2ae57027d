//! Event Routes
//!
//! - GET /api/v1/events?q= - Event list, optionally filtered
//! - GET /api/v1/events/status - Index status
//! - PUT /api/v1/events/visibility - Mark the list surface visible or hidden
//! - GET /api/v1/events/:key - One event with its items

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{EventListResponse, EventSummary, EventsQuery, VisibilityRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::events::{IndexStatus, NutEvent};

/// GET /api/v1/events
///
/// Without `q` the full list is returned.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<EventListResponse> {
    let filter = query.q.unwrap_or_default();
    let matched = state.events.apply_filter(&filter).await;
    let status = state.events.status().await;

    Json(EventListResponse {
        events: matched
            .iter()
            .map(|(key, event)| EventSummary::new(key, event))
            .collect(),
        total: status.total_events,
        filter: filter.to_lowercase(),
    })
}

/// GET /api/v1/events/:key
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<NutEvent>> {
    state
        .events
        .get(&key)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Event '{}' not found", key)))
}

/// GET /api/v1/events/status
pub async fn index_status(State(state): State<Arc<AppState>>) -> Json<IndexStatus> {
    Json(state.events.status().await)
}

/// PUT /api/v1/events/visibility
///
/// Becoming visible runs a rebuild deferred while hidden.
pub async fn set_visibility(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VisibilityRequest>,
) -> Json<IndexStatus> {
    state.events.set_visible(req.visible).await;
    Json(state.events.status().await)
}
