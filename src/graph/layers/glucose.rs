use super::{mismatch, DrawContext};
use crate::error::CoreError;
use crate::graph::{GraphDataPoint, GraphLayout, PointDetail, Primitive, Rect, Style};
use crate::store::{ClinicalRecord, RecordKind};

const GLUCOSE_DOT_DIAMETER: f64 = 7.0;

/// Blood-glucose trace: one dot per sample, styled by range
#[derive(Debug, Clone, Default)]
pub struct GlucoseLayer {
    pub(crate) points: Vec<GraphDataPoint>,
    pixels_per_value: f64,
    y_bottom: f64,
    y_top: f64,
    low_mgdl: f64,
    high_mgdl: f64,
}

impl GlucoseLayer {
    pub fn nominal_pixel_width(&self) -> f64 {
        GLUCOSE_DOT_DIAMETER
    }

    pub fn load_record(
        &mut self,
        record: &ClinicalRecord,
        time_offset_secs: f64,
        _layout: &mut GraphLayout,
    ) -> Result<(), CoreError> {
        let RecordKind::Glucose { value, units, .. } = &record.kind else {
            return Err(mismatch("glucose", record));
        };
        let raw_value = value.unwrap_or(0.0);
        let mgdl = if raw_value > 0.0 { units.to_mgdl(raw_value) } else { 0.0 };
        self.points.push(GraphDataPoint::new(
            record.id.clone(),
            mgdl,
            time_offset_secs,
            PointDetail::Glucose { raw_value },
        ));
        Ok(())
    }

    pub fn configure(&mut self, layout: &GraphLayout) {
        self.pixels_per_value = if layout.glucose_range_mgdl > 0.0 {
            layout.y_pixels_glucose / layout.glucose_range_mgdl
        } else {
            0.0
        };
        self.y_bottom = layout.y_bottom_of_glucose;
        self.y_top = layout.y_top_of_glucose;
        self.low_mgdl = layout.glucose_low_mgdl;
        self.high_mgdl = layout.glucose_high_mgdl;
    }

    pub fn draw_point(
        &mut self,
        x: f64,
        point: &mut GraphDataPoint,
        _ctx: &DrawContext,
    ) -> Vec<Primitive> {
        // Values above the range sit on the top edge of the band
        let center_y = (self.y_bottom - point.value * self.pixels_per_value).max(self.y_top);
        let radius = GLUCOSE_DOT_DIAMETER / 2.0;
        let bounds = Rect::centered_x(x, center_y - radius, GLUCOSE_DOT_DIAMETER, GLUCOSE_DOT_DIAMETER);
        let style = if point.value < self.low_mgdl {
            Style::GlucoseLow
        } else if point.value > self.high_mgdl {
            Style::GlucoseHigh
        } else {
            Style::GlucoseTarget
        };
        vec![Primitive::circle(bounds, style)]
    }
}
