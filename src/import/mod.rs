//! Record Import
//!
//! Fills the record store from files:
//! - CSV exports of logged meals, workouts and insulin entries
//! - Apple Health exports (blood-glucose samples only)

mod apple_health;
mod csv_import;

pub use apple_health::{parse_export_xml, AppleHealthImporter};
pub use csv_import::{CsvImportResult, CsvRecordImporter};

use crate::store::StoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Errors that can occur while importing
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("No export.xml found in archive")]
    MissingExport,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Parse a timestamp in one of the formats seen in exports
///
/// Date-only values are placed at noon UTC.
pub(crate) fn parse_timestamp(ts_str: &str, preferred_format: Option<&str>) -> Result<i64, ImportError> {
    let ts_str = ts_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(ts_str) {
        return Ok(dt.with_timezone(&Utc).timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(ts_str, "%Y-%m-%d %H:%M:%S %z") {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(ms) = ts_str.parse::<i64>() {
        return Ok(ms);
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d",
        "%m/%d/%Y %H:%M",
        "%m/%d/%Y",
        "%Y/%m/%d",
    ];

    for fmt in preferred_format.into_iter().chain(formats) {
        if let Ok(dt) = NaiveDateTime::parse_from_str(ts_str, fmt) {
            return Ok(dt.and_utc().timestamp_millis());
        }
        if let Ok(date) = NaiveDate::parse_from_str(ts_str, fmt) {
            if let Some(noon) = date.and_hms_opt(12, 0, 0) {
                return Ok(noon.and_utc().timestamp_millis());
            }
        }
    }

    Err(ImportError::ParseError(format!(
        "Could not parse timestamp: {}",
        ts_str
    )))
}

/// UTC offset in minutes carried by a timestamp string, if any
pub(crate) fn parse_offset_minutes(ts_str: &str) -> Option<i32> {
    let ts_str = ts_str.trim();
    DateTime::parse_from_rfc3339(ts_str)
        .or_else(|_| DateTime::parse_from_str(ts_str, "%Y-%m-%d %H:%M:%S %z"))
        .ok()
        .map(|dt| dt.offset().local_minus_utc() / 60)
}
