//! Graph layers
//!
//! One variant per record type. [`GraphLayer`] dispatches the shared
//! capability set to the concrete layer:
//!
//! | capability            | meaning                                          |
//! |-----------------------|--------------------------------------------------|
//! | `type_str`            | layer identifier                                 |
//! | `nominal_pixel_width` | on-screen width of one point, used for culling   |
//! | `load_record`         | record + time offset → zero or one data point    |
//! | `configure`           | per-frame state derived from the final layout    |
//! | `draw_point`          | one data point at pixel x → primitives           |

mod basal;
mod bolus;
mod glucose;
mod meal;
mod wizard;
mod workout;

pub use basal::BasalLayer;
pub use bolus::{BolusLayer, BOLUS_BAR_WIDTH};
pub use glucose::GlucoseLayer;
pub use meal::MealLayer;
pub use wizard::{bolus_top_at, nil_aware_gt, WizardLayer, WIZARD_CIRCLE_DIAMETER};
pub use workout::WorkoutLayer;

use crate::error::CoreError;
use crate::graph::{GraphDataPoint, GraphLayout, Primitive, Rect, TimeWindow};
use crate::store::{ClinicalRecord, RecordType};
use serde::Serialize;

/// Layer identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Glucose,
    Meal,
    Wizard,
    Bolus,
    Basal,
    Workout,
}

impl LayerKind {
    /// Layers in declaration order
    pub fn all() -> &'static [LayerKind] {
        &[
            LayerKind::Glucose,
            LayerKind::Meal,
            LayerKind::Wizard,
            LayerKind::Bolus,
            LayerKind::Basal,
            LayerKind::Workout,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayerKind::Glucose => "glucose",
            LayerKind::Meal => "meal",
            LayerKind::Wizard => "wizard",
            LayerKind::Bolus => "bolus",
            LayerKind::Basal => "basal",
            LayerKind::Workout => "workout",
        }
    }

    /// Draw order: lower ranks paint first. Bolus must precede wizard.
    pub fn draw_rank(&self) -> u8 {
        match self {
            LayerKind::Basal => 0,
            LayerKind::Workout => 1,
            LayerKind::Glucose => 2,
            LayerKind::Meal => 3,
            LayerKind::Bolus => 4,
            LayerKind::Wizard => 5,
        }
    }

    /// Layer that renders records of `record_type`
    pub fn for_record(record_type: RecordType) -> LayerKind {
        match record_type {
            RecordType::Glucose => LayerKind::Glucose,
            RecordType::Meal => LayerKind::Meal,
            RecordType::Wizard => LayerKind::Wizard,
            RecordType::Bolus => LayerKind::Bolus,
            RecordType::Basal => LayerKind::Basal,
            RecordType::Workout => LayerKind::Workout,
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only state shared with layers during the draw phase
#[derive(Debug, Clone)]
pub struct DrawContext {
    pub window: TimeWindow,
    /// Bar-plus-label rectangles published by the bolus layer
    pub bolus_rects: Vec<Rect>,
}

impl DrawContext {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            bolus_rects: Vec::new(),
        }
    }
}

/// A graph layer
#[derive(Debug, Clone)]
pub enum GraphLayer {
    Glucose(GlucoseLayer),
    Meal(MealLayer),
    Wizard(WizardLayer),
    Bolus(BolusLayer),
    Basal(BasalLayer),
    Workout(WorkoutLayer),
}

/// Dispatch one call to the concrete layer
macro_rules! dispatch {
    ($self:expr, $layer:ident => $body:expr) => {
        match $self {
            GraphLayer::Glucose($layer) => $body,
            GraphLayer::Meal($layer) => $body,
            GraphLayer::Wizard($layer) => $body,
            GraphLayer::Bolus($layer) => $body,
            GraphLayer::Basal($layer) => $body,
            GraphLayer::Workout($layer) => $body,
        }
    };
}

impl GraphLayer {
    pub fn new(kind: LayerKind) -> Self {
        match kind {
            LayerKind::Glucose => GraphLayer::Glucose(GlucoseLayer::default()),
            LayerKind::Meal => GraphLayer::Meal(MealLayer::default()),
            LayerKind::Wizard => GraphLayer::Wizard(WizardLayer::default()),
            LayerKind::Bolus => GraphLayer::Bolus(BolusLayer::default()),
            LayerKind::Basal => GraphLayer::Basal(BasalLayer::default()),
            LayerKind::Workout => GraphLayer::Workout(WorkoutLayer::default()),
        }
    }

    pub fn kind(&self) -> LayerKind {
        match self {
            GraphLayer::Glucose(_) => LayerKind::Glucose,
            GraphLayer::Meal(_) => LayerKind::Meal,
            GraphLayer::Wizard(_) => LayerKind::Wizard,
            GraphLayer::Bolus(_) => LayerKind::Bolus,
            GraphLayer::Basal(_) => LayerKind::Basal,
            GraphLayer::Workout(_) => LayerKind::Workout,
        }
    }

    pub fn type_str(&self) -> &'static str {
        self.kind().as_str()
    }

    pub fn nominal_pixel_width(&self) -> f64 {
        dispatch!(self, layer => layer.nominal_pixel_width())
    }

    /// Horizontal extent of a point drawn at `x` spanning `span_px`
    pub fn x_extent(&self, x: f64, span_px: f64) -> (f64, f64) {
        let half = self.nominal_pixel_width() / 2.0;
        (x - half, x + half.max(span_px))
    }

    /// Load one record; returns false if it was skipped
    ///
    /// A record of another type is skipped with a trace log.
    pub fn load_record(
        &mut self,
        record: &ClinicalRecord,
        time_offset_secs: f64,
        layout: &mut GraphLayout,
    ) -> bool {
        let result = dispatch!(self, layer => layer.load_record(record, time_offset_secs, layout));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::trace!(error = %e, "Skipping record");
                false
            }
        }
    }

    pub fn configure(&mut self, layout: &GraphLayout) {
        dispatch!(self, layer => layer.configure(layout))
    }

    /// Draw one point at pixel `x`
    pub fn draw_point(
        &mut self,
        x: f64,
        point: &mut GraphDataPoint,
        ctx: &DrawContext,
    ) -> Vec<Primitive> {
        dispatch!(self, layer => layer.draw_point(x, point, ctx))
    }

    pub fn points(&self) -> &[GraphDataPoint] {
        dispatch!(self, layer => &layer.points)
    }

    fn points_mut(&mut self) -> &mut Vec<GraphDataPoint> {
        dispatch!(self, layer => &mut layer.points)
    }

    /// Draw every loaded point that falls inside the window
    ///
    /// Zero-value points stay in `points()` but produce no primitives.
    pub fn draw(&mut self, ctx: &DrawContext) -> Vec<Primitive> {
        let mut points = std::mem::take(self.points_mut());
        let mut primitives = Vec::new();
        let pps = ctx.window.pixels_per_second();

        for point in points.iter_mut() {
            if point.is_zero() {
                continue;
            }
            let x = ctx.window.x_for_offset(point.time_offset_secs);
            let (left, right) = self.x_extent(x, point.detail.duration_secs() * pps);
            if !ctx.window.contains_with_margin(left, right) {
                continue;
            }
            primitives.extend(self.draw_point(x, point, ctx));
        }

        *self.points_mut() = points;
        primitives
    }
}

/// Type-mismatch error for a layer
pub(crate) fn mismatch(layer: &'static str, record: &ClinicalRecord) -> CoreError {
    CoreError::TypeMismatch {
        layer,
        found: record.record_type(),
        id: record.id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::store::RecordKind;

    fn glucose(id: &str) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            0,
            RecordKind::Glucose {
                value: Some(120.0),
                units: Default::default(),
                source: None,
            },
        )
    }

    #[test]
    fn test_bolus_draws_before_wizard() {
        assert!(LayerKind::Bolus.draw_rank() < LayerKind::Wizard.draw_rank());
    }

    #[test]
    fn test_layer_per_record_type() {
        for record_type in RecordType::all() {
            let kind = LayerKind::for_record(*record_type);
            assert_eq!(kind.as_str(), record_type.as_str());
            assert_eq!(GraphLayer::new(kind).type_str(), kind.as_str());
        }
    }

    #[test]
    fn test_type_mismatch_is_skipped() {
        let mut layout = GraphLayout::new(800.0, 400.0, &GraphConfig::default());
        for kind in LayerKind::all() {
            if *kind == LayerKind::Glucose {
                continue;
            }
            let mut layer = GraphLayer::new(*kind);
            assert!(!layer.load_record(&glucose("g1"), 0.0, &mut layout));
            assert!(layer.points().is_empty());
        }

        let mut layer = GraphLayer::new(LayerKind::Glucose);
        assert!(layer.load_record(&glucose("g1"), 0.0, &mut layout));
        assert_eq!(layer.points().len(), 1);
    }

    #[test]
    fn test_x_extent_covers_duration() {
        let layer = GraphLayer::new(LayerKind::Wizard);
        assert_eq!(layer.x_extent(100.0, 0.0), (84.5, 115.5));
        let layer = GraphLayer::new(LayerKind::Basal);
        let (left, right) = layer.x_extent(100.0, 50.0);
        assert!(left <= 100.0);
        assert_eq!(right, 150.0);
    }
}
