use super::{mismatch, DrawContext};
use crate::error::CoreError;
use crate::graph::{GraphDataPoint, GraphLayout, PointDetail, Primitive, Rect, Style};
use crate::store::{ClinicalRecord, RecordKind};

/// Basal delivery: rectangles spanning each segment's duration
#[derive(Debug, Clone, Default)]
pub struct BasalLayer {
    pub(crate) points: Vec<GraphDataPoint>,
    pixels_per_unit: f64,
    baseline: f64,
}

impl BasalLayer {
    pub fn nominal_pixel_width(&self) -> f64 {
        1.0
    }

    pub fn load_record(
        &mut self,
        record: &ClinicalRecord,
        time_offset_secs: f64,
        layout: &mut GraphLayout,
    ) -> Result<(), CoreError> {
        let RecordKind::Basal {
            rate,
            delivery_type,
            ..
        } = &record.kind
        else {
            return Err(mismatch("basal", record));
        };
        let rate = rate.unwrap_or(0.0);
        layout.widen_basal(rate);
        self.points.push(GraphDataPoint::new(
            record.id.clone(),
            rate,
            time_offset_secs,
            PointDetail::Basal {
                duration_secs: record.duration_secs().unwrap_or(0.0),
                delivery_type: delivery_type.clone(),
            },
        ));
        Ok(())
    }

    pub fn configure(&mut self, layout: &GraphLayout) {
        self.pixels_per_unit = if layout.max_basal > 0.0 {
            layout.y_pixels_basal / layout.max_basal
        } else {
            0.0
        };
        self.baseline = layout.y_bottom_of_basal;
    }

    pub fn draw_point(
        &mut self,
        x: f64,
        point: &mut GraphDataPoint,
        ctx: &DrawContext,
    ) -> Vec<Primitive> {
        let width = (point.detail.duration_secs() * ctx.window.pixels_per_second()).max(1.0);
        let height = point.value * self.pixels_per_unit;
        let style = match &point.detail {
            PointDetail::Basal {
                delivery_type: Some(kind),
                ..
            } if kind.eq_ignore_ascii_case("temp") => Style::BasalTemp,
            _ => Style::BasalRate,
        };
        vec![Primitive::rect(
            Rect::new(x, self.baseline - height, width, height),
            style,
        )]
    }
}
