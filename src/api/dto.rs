//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.

use crate::events::{IndexStatus, NutEvent, NutEventKind};
use crate::store::ClinicalRecord;
use serde::{Deserialize, Serialize};

// ============================================
// EVENT DTOs
// ============================================

/// Query parameters for the event list
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Case-insensitive search text
    #[serde(default)]
    pub q: Option<String>,
}

/// One row of the event list
#[derive(Debug, Serialize)]
pub struct EventSummary {
    pub key: String,
    pub kind: NutEventKind,
    pub title: String,
    pub location: String,
    /// Most recent item timestamp (ms since epoch)
    pub most_recent: i64,
    pub item_count: usize,
    pub total_carbs: f64,
}

impl EventSummary {
    pub fn new(key: &str, event: &NutEvent) -> Self {
        Self {
            key: key.to_string(),
            kind: event.kind(),
            title: event.title().to_string(),
            location: event.location().to_string(),
            most_recent: event.most_recent(),
            item_count: event.item_count(),
            total_carbs: event.total_carbs(),
        }
    }
}

/// Event list response
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub events: Vec<EventSummary>,
    /// Events in the full index
    pub total: usize,
    pub filter: String,
}

/// Visibility change request
#[derive(Debug, Deserialize)]
pub struct VisibilityRequest {
    pub visible: bool,
}

// ============================================
// GRAPH DTOs
// ============================================

/// Query parameters for a graph frame
#[derive(Debug, Default, Deserialize)]
pub struct GraphQuery {
    /// Window start: ms timestamp, RFC 3339, "now" or "now-6h"
    #[serde(default)]
    pub start: Option<String>,
    /// Window length in hours
    #[serde(default)]
    pub hours: Option<f64>,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

// ============================================
// RECORD DTOs
// ============================================

/// Batch record ingest request
#[derive(Debug, Deserialize)]
pub struct IngestRecordsRequest {
    pub records: Vec<ClinicalRecord>,
}

/// Batch record ingest response
#[derive(Debug, Serialize)]
pub struct IngestRecordsResponse {
    /// Status: "ok" or "partial"
    pub status: String,
    pub accepted: usize,
    pub rejected: usize,
    /// Errors for rejected records
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<BatchError>,
}

/// Error for a single record in a batch
#[derive(Debug, Serialize)]
pub struct BatchError {
    pub index: usize,
    pub error: String,
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded"
    pub status: String,
    pub store: String,
    pub records: Option<u64>,
    pub event_index: IndexStatus,
    pub uptime_seconds: u64,
    pub version: String,
}
