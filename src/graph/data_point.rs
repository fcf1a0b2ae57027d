//! Per-layer data points produced by the load phase

use serde::Serialize;

/// One loaded record in a layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphDataPoint {
    pub source_record_id: String,
    /// Primary value; zero means "loaded but not drawn"
    pub value: f64,
    /// Seconds from the window start
    pub time_offset_secs: f64,
    pub detail: PointDetail,
}

impl GraphDataPoint {
    pub fn new(
        source_record_id: impl Into<String>,
        value: f64,
        time_offset_secs: f64,
        detail: PointDetail,
    ) -> Self {
        Self {
            source_record_id: source_record_id.into(),
            value,
            time_offset_secs,
            detail,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }
}

/// Layer-specific fields of a data point
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum PointDetail {
    Glucose {
        /// Value as recorded, before unit conversion
        raw_value: f64,
    },
    Meal {
        title: Option<String>,
    },
    Wizard {
        bolus_id: Option<String>,
        recommended_net: Option<f64>,
        /// Top of the bolus bar the circle sits on; set during draw
        bolus_top_y: Option<f64>,
    },
    Bolus {
        extended: Option<f64>,
        duration_secs: f64,
    },
    Basal {
        duration_secs: f64,
        delivery_type: Option<String>,
    },
    Workout {
        duration_secs: f64,
        title: Option<String>,
    },
}

impl PointDetail {
    /// Span of the point in seconds, for duration-shaped layers
    pub fn duration_secs(&self) -> f64 {
        match self {
            PointDetail::Basal { duration_secs, .. }
            | PointDetail::Workout { duration_secs, .. } => *duration_secs,
            _ => 0.0,
        }
    }
}
