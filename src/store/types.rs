//! Core record types read by the event and graph pipelines
//!
//! - `ClinicalRecord`: one persisted, time-stamped entry for a user
//! - `RecordKind`: type-specific payload (meal, workout, wizard, bolus, basal, glucose)
//! - `GlucoseUnits`: units carried by blood-glucose samples

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// mg/dL per mmol/L
pub const MMOL_TO_MGDL: f64 = 18.0182;

/// A single persisted clinical record
///
/// Timestamps are UTC milliseconds; the timezone offset is only used to
/// display local wall-clock time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClinicalRecord {
    /// Record identifier, unique within a user's record set
    #[serde(default)]
    pub id: String,
    /// Owning user
    #[serde(default)]
    pub user_id: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Offset from UTC in minutes at the time the record was logged
    #[serde(default)]
    pub timezone_offset_minutes: i32,
    /// When the record was created, if different from `timestamp`
    #[serde(default)]
    pub created_time: Option<i64>,
    /// Originating composite identifier shared by records of one real-world event
    #[serde(default)]
    pub event_key: Option<String>,
    /// Type-specific fields
    #[serde(flatten)]
    pub kind: RecordKind,
}

/// Type-specific record payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecordKind {
    Meal {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        location: Option<String>,
        #[serde(default)]
        carb_input: Option<f64>,
        #[serde(default)]
        photo_urls: Vec<String>,
    },
    Workout {
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        notes: Option<String>,
        #[serde(default)]
        location: Option<String>,
        #[serde(default)]
        duration_secs: Option<f64>,
        #[serde(default)]
        distance: Option<f64>,
    },
    Wizard {
        #[serde(default)]
        carb_input: Option<f64>,
        /// Id of the bolus record delivered for this recommendation
        #[serde(default)]
        bolus_id: Option<String>,
        #[serde(default)]
        recommended_net: Option<f64>,
        #[serde(default)]
        notes: Option<String>,
    },
    Bolus {
        #[serde(default)]
        normal: Option<f64>,
        #[serde(default)]
        extended: Option<f64>,
        /// Duration of the extended portion in milliseconds
        #[serde(default)]
        duration_ms: Option<i64>,
    },
    Basal {
        #[serde(default)]
        rate: Option<f64>,
        #[serde(default)]
        duration_ms: Option<i64>,
        #[serde(default)]
        delivery_type: Option<String>,
    },
    Glucose {
        #[serde(default)]
        value: Option<f64>,
        #[serde(default)]
        units: GlucoseUnits,
        #[serde(default)]
        source: Option<String>,
    },
}

/// Units of a blood-glucose sample
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum GlucoseUnits {
    #[default]
    #[serde(rename = "mg/dL", alias = "mgdl")]
    MgDl,
    #[serde(rename = "mmol/L", alias = "mmol")]
    MmolL,
}

impl GlucoseUnits {
    /// Convert a value in these units to mg/dL
    pub fn to_mgdl(&self, value: f64) -> f64 {
        match self {
            GlucoseUnits::MgDl => value,
            GlucoseUnits::MmolL => value * MMOL_TO_MGDL,
        }
    }

    /// Parse a unit string as used by exports ("mg/dL", "mmol<180.1558800000541>/L", ...)
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        if lower.starts_with("mg") {
            Some(GlucoseUnits::MgDl)
        } else if lower.starts_with("mmol") {
            Some(GlucoseUnits::MmolL)
        } else {
            None
        }
    }
}

impl std::fmt::Display for GlucoseUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GlucoseUnits::MgDl => write!(f, "mg/dL"),
            GlucoseUnits::MmolL => write!(f, "mmol/L"),
        }
    }
}

/// Discriminant of `RecordKind`, used for dispatch and storage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Meal,
    Workout,
    Wizard,
    Bolus,
    Basal,
    Glucose,
}

impl RecordType {
    pub fn all() -> &'static [RecordType] {
        &[
            RecordType::Meal,
            RecordType::Workout,
            RecordType::Wizard,
            RecordType::Bolus,
            RecordType::Basal,
            RecordType::Glucose,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Meal => "meal",
            RecordType::Workout => "workout",
            RecordType::Wizard => "wizard",
            RecordType::Bolus => "bolus",
            RecordType::Basal => "basal",
            RecordType::Glucose => "glucose",
        }
    }
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown record type: {}", s))
    }
}

impl ClinicalRecord {
    /// Create a record with the given identity and payload
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        timestamp: i64,
        kind: RecordKind,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            timestamp,
            timezone_offset_minutes: 0,
            created_time: None,
            event_key: None,
            kind,
        }
    }

    /// Builder: set the originating composite identifier
    pub fn event_key(mut self, key: impl Into<String>) -> Self {
        self.event_key = Some(key.into());
        self
    }

    /// Builder: set the display timezone offset
    pub fn timezone_offset(mut self, minutes: i32) -> Self {
        self.timezone_offset_minutes = minutes;
        self
    }

    pub fn record_type(&self) -> RecordType {
        match self.kind {
            RecordKind::Meal { .. } => RecordType::Meal,
            RecordKind::Workout { .. } => RecordType::Workout,
            RecordKind::Wizard { .. } => RecordType::Wizard,
            RecordKind::Bolus { .. } => RecordType::Bolus,
            RecordKind::Basal { .. } => RecordType::Basal,
            RecordKind::Glucose { .. } => RecordType::Glucose,
        }
    }

    /// Timestamp in fractional seconds
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp as f64 / 1000.0
    }

    pub fn title(&self) -> Option<&str> {
        match &self.kind {
            RecordKind::Meal { title, .. } | RecordKind::Workout { title, .. } => title.as_deref(),
            _ => None,
        }
    }

    pub fn notes(&self) -> Option<&str> {
        match &self.kind {
            RecordKind::Meal { notes, .. }
            | RecordKind::Workout { notes, .. }
            | RecordKind::Wizard { notes, .. } => notes.as_deref(),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match &self.kind {
            RecordKind::Meal { location, .. } | RecordKind::Workout { location, .. } => {
                location.as_deref()
            }
            _ => None,
        }
    }

    /// Photo references attached to a meal
    pub fn photo_urls(&self) -> &[String] {
        match &self.kind {
            RecordKind::Meal { photo_urls, .. } => photo_urls,
            _ => &[],
        }
    }

    /// Searchable text fields (title, notes, location)
    pub fn text_fields(&self) -> impl Iterator<Item = &str> {
        [self.title(), self.notes(), self.location()]
            .into_iter()
            .flatten()
    }

    /// Duration covered by the record, in seconds, for span-shaped records
    pub fn duration_secs(&self) -> Option<f64> {
        match &self.kind {
            RecordKind::Workout { duration_secs, .. } => *duration_secs,
            RecordKind::Basal { duration_ms, .. } => duration_ms.map(|d| d as f64 / 1000.0),
            RecordKind::Bolus { duration_ms, .. } => duration_ms.map(|d| d as f64 / 1000.0),
            _ => None,
        }
    }

    /// Local wall-clock time for display
    pub fn local_time(&self) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.timezone_offset_minutes * 60)?;
        let utc = Utc.timestamp_millis_opt(self.timestamp).single()?;
        Some(utc.with_timezone(&offset))
    }
}
