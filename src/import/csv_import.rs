//! CSV Import
//!
//! Imports logged records from a CSV file with a header row. Columns are
//! matched by name; only `type` and `timestamp` are required.
//!
//! ```text
//! type,timestamp,id,title,location,carbs,normal,bolus_id,...
//! meal,2024-01-15 12:30:00,m1,Lunch,Cafe,45,,,
//! bolus,2024-01-15 12:32:00,b1,,,,4.5,,
//! ```

use super::{parse_offset_minutes, parse_timestamp, ImportError};
use crate::store::{ClinicalRecord, GlucoseUnits, RecordKind, RecordType};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

const MAX_REPORTED_ERRORS: usize = 100;

/// One CSV row; unused columns for a record type are ignored
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    #[serde(rename = "type")]
    record_type: String,
    timestamp: String,
    id: Option<String>,
    event_key: Option<String>,
    title: Option<String>,
    notes: Option<String>,
    location: Option<String>,
    carbs: Option<f64>,
    /// Semicolon-separated photo references
    photos: Option<String>,
    duration_minutes: Option<f64>,
    distance: Option<f64>,
    bolus_id: Option<String>,
    recommended: Option<f64>,
    normal: Option<f64>,
    extended: Option<f64>,
    rate: Option<f64>,
    delivery_type: Option<String>,
    value: Option<f64>,
    units: Option<String>,
    source: Option<String>,
    tz_offset_minutes: Option<i32>,
}

/// Result of a CSV import operation
#[derive(Debug)]
pub struct CsvImportResult {
    pub records: Vec<ClinicalRecord>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

/// CSV record importer
pub struct CsvRecordImporter {
    user_id: String,
    /// Tried before the built-in timestamp formats
    timestamp_format: Option<String>,
    delimiter: u8,
}

impl CsvRecordImporter {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp_format: None,
            delimiter: b',',
        }
    }

    /// Set the timestamp format string
    pub fn with_timestamp_format(mut self, format: &str) -> Self {
        self.timestamp_format = Some(format.to_string());
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Import records from a CSV file
    pub fn import(&self, path: &Path) -> Result<CsvImportResult, ImportError> {
        let file = std::fs::File::open(path)?;
        self.import_reader(file)
    }

    /// Import from a CSV string
    pub fn import_str(&self, csv_data: &str) -> Result<CsvImportResult, ImportError> {
        self.import_reader(csv_data.as_bytes())
    }

    fn import_reader<R: Read>(&self, input: R) -> Result<CsvImportResult, ImportError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .delimiter(self.delimiter)
            .from_reader(input);

        let mut records = Vec::new();
        let mut rows_failed = 0;
        let mut errors = Vec::new();

        for (line_num, result) in reader.deserialize::<CsvRow>().enumerate() {
            let actual_line = line_num + 2;

            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    errors.push(format!("Line {}: {}", actual_line, e));
                    rows_failed += 1;
                    continue;
                }
            };

            match self.row_to_record(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    errors.push(format!("Line {}: {}", actual_line, e));
                    rows_failed += 1;
                }
            }
        }

        if errors.len() > MAX_REPORTED_ERRORS {
            let total = errors.len();
            errors.truncate(MAX_REPORTED_ERRORS);
            errors.push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }

        tracing::debug!(
            imported = records.len(),
            failed = rows_failed,
            "CSV import finished"
        );

        Ok(CsvImportResult {
            rows_processed: records.len(),
            records,
            rows_failed,
            errors,
        })
    }

    fn row_to_record(&self, row: CsvRow) -> Result<ClinicalRecord, ImportError> {
        let record_type: RecordType = row
            .record_type
            .parse()
            .map_err(|_| ImportError::ParseError(format!("Unknown record type: {:?}", row.record_type)))?;
        let timestamp = parse_timestamp(&row.timestamp, self.timestamp_format.as_deref())?;
        let duration_secs = row.duration_minutes.map(|m| m * 60.0);
        let duration_ms = duration_secs.map(|s| (s * 1000.0) as i64);

        let kind = match record_type {
            RecordType::Meal => RecordKind::Meal {
                title: non_empty(row.title),
                notes: non_empty(row.notes),
                location: non_empty(row.location),
                carb_input: row.carbs,
                photo_urls: row
                    .photos
                    .map(|p| {
                        p.split(';')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            RecordType::Workout => RecordKind::Workout {
                title: non_empty(row.title),
                notes: non_empty(row.notes),
                location: non_empty(row.location),
                duration_secs,
                distance: row.distance,
            },
            RecordType::Wizard => RecordKind::Wizard {
                carb_input: row.carbs,
                bolus_id: non_empty(row.bolus_id),
                recommended_net: row.recommended,
                notes: non_empty(row.notes),
            },
            RecordType::Bolus => RecordKind::Bolus {
                normal: row.normal,
                extended: row.extended,
                duration_ms,
            },
            RecordType::Basal => RecordKind::Basal {
                rate: row.rate,
                duration_ms,
                delivery_type: non_empty(row.delivery_type),
            },
            RecordType::Glucose => RecordKind::Glucose {
                value: row.value,
                units: row
                    .units
                    .as_deref()
                    .and_then(GlucoseUnits::parse)
                    .unwrap_or_default(),
                source: non_empty(row.source),
            },
        };

        let id = non_empty(row.id).unwrap_or_else(|| format!("csv-{}", uuid::Uuid::new_v4()));
        let offset = row
            .tz_offset_minutes
            .or_else(|| parse_offset_minutes(&row.timestamp))
            .unwrap_or(0);

        let mut record = ClinicalRecord::new(id, self.user_id.clone(), timestamp, kind).timezone_offset(offset);
        if let Some(key) = non_empty(row.event_key) {
            record = record.event_key(key);
        }
        Ok(record)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
