//! Graph Routes
//!
//! - GET /api/v1/graph?start=&hours=&width=&height= - Rendered graph frame

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::GraphQuery;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::graph::{GraphFrame, TimeWindow};

const MAX_HOURS: f64 = 14.0 * 24.0;
const MAX_PIXELS: f64 = 10_000.0;
const MAX_TIME_DISTANCE_MS: i64 = 100 * 365 * 24 * 3600 * 1000;

/// GET /api/v1/graph
///
/// Defaults to the configured window ending now.
pub async fn get_graph(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GraphQuery>,
) -> ApiResult<Json<GraphFrame>> {
    let config = state.renderer.config();
    let hours = query.hours.unwrap_or(config.window_hours);
    let width = query.width.unwrap_or(config.width_px);
    let height = query.height.unwrap_or(config.height_px);

    if !(hours > 0.0 && hours <= MAX_HOURS) {
        return Err(ApiError::Validation(format!(
            "hours must be in (0, {}]",
            MAX_HOURS
        )));
    }
    for (name, value) in [("width", width), ("height", height)] {
        if !(value >= 1.0 && value <= MAX_PIXELS) {
            return Err(ApiError::Validation(format!(
                "{} must be in [1, {}]",
                name, MAX_PIXELS
            )));
        }
    }

    let window = match query.start.as_deref() {
        Some(start) => TimeWindow::new(parse_time_param(start)?, hours * 3600.0, width),
        None => TimeWindow::ending_at(Utc::now(), hours, width),
    };

    let frame = state
        .renderer
        .render_from_store(state.store.as_ref(), &state.user_id, window, height)
        .await;
    Ok(Json(frame))
}

/// Parse a time parameter: ms timestamp, RFC 3339, "now" or "now-Nh"
///
/// Results further than 100 years from now are rejected.
pub fn parse_time_param(s: &str) -> ApiResult<i64> {
    let ts = if let Ok(ts) = s.parse::<i64>() {
        ts
    } else if s.starts_with("now") {
        parse_relative_time(s)?
    } else if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        dt.timestamp_millis()
    } else if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        dt.and_utc().timestamp_millis()
    } else {
        return Err(ApiError::Validation(format!("Cannot parse time: {}", s)));
    };

    let now = Utc::now().timestamp_millis();
    if (ts as i128 - now as i128).abs() > MAX_TIME_DISTANCE_MS as i128 {
        return Err(ApiError::Validation(format!(
            "Time {} is more than 100 years from now",
            s
        )));
    }
    Ok(ts)
}

/// Parse relative time like "now-6h"
fn parse_relative_time(s: &str) -> ApiResult<i64> {
    let now = Utc::now().timestamp_millis();

    if s == "now" {
        return Ok(now);
    }

    // "now-Nm" (minutes), "now-Nh", "now-Nd", "now-Nw"
    let re = regex::Regex::new(r"^now-(\d+)([mhdw])$")
        .map_err(|_| ApiError::Internal("Regex error".to_string()))?;

    let caps = re
        .captures(s)
        .ok_or_else(|| ApiError::Validation(format!("Invalid relative time: {}", s)))?;
    let amount: i64 = caps[1]
        .parse()
        .map_err(|_| ApiError::Validation("Invalid number in time expression".to_string()))?;

    let unit_ms: i64 = match &caps[2] {
        "m" => 60 * 1000,
        "h" => 3600 * 1000,
        "d" => 24 * 3600 * 1000,
        "w" => 7 * 24 * 3600 * 1000,
        unit => return Err(ApiError::Validation(format!("Invalid time unit: {}", unit))),
    };
    amount
        .checked_mul(unit_ms)
        .and_then(|ms| now.checked_sub(ms))
        .ok_or_else(|| ApiError::Validation(format!("Time out of range: {}", s)))
}
