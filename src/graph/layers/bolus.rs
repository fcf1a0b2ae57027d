use super::{mismatch, DrawContext};
use crate::error::CoreError;
use crate::graph::{format_label, GraphDataPoint, GraphLayout, PointDetail, Primitive, Rect, Style};
use crate::store::{ClinicalRecord, RecordKind};

/// Width of a bolus bar in pixels
pub const BOLUS_BAR_WIDTH: f64 = 14.0;
const BOLUS_LABEL_WIDTH: f64 = 24.0;

/// Insulin deliveries: bars standing on the bolus baseline
///
/// Every drawn bar publishes its bar-plus-label rectangle through
/// [`BolusLayer::rects`] for the wizard layer.
#[derive(Debug, Clone, Default)]
pub struct BolusLayer {
    pub(crate) points: Vec<GraphDataPoint>,
    rects: Vec<Rect>,
    pixels_per_unit: f64,
    baseline: f64,
    label_height: f64,
}

impl BolusLayer {
    pub fn nominal_pixel_width(&self) -> f64 {
        BOLUS_LABEL_WIDTH
    }

    pub fn load_record(
        &mut self,
        record: &ClinicalRecord,
        time_offset_secs: f64,
        layout: &mut GraphLayout,
    ) -> Result<(), CoreError> {
        let RecordKind::Bolus {
            normal, extended, ..
        } = &record.kind
        else {
            return Err(mismatch("bolus", record));
        };
        let value = normal.unwrap_or(0.0) + extended.unwrap_or(0.0);
        layout.widen_bolus(value);
        self.points.push(GraphDataPoint::new(
            record.id.clone(),
            value,
            time_offset_secs,
            PointDetail::Bolus {
                extended: *extended,
                duration_secs: record.duration_secs().unwrap_or(0.0),
            },
        ));
        Ok(())
    }

    pub fn configure(&mut self, layout: &GraphLayout) {
        self.pixels_per_unit = if layout.max_bolus > 0.0 {
            layout.y_pixels_bolus / layout.max_bolus
        } else {
            0.0
        };
        self.baseline = layout.y_bottom_of_bolus;
        self.label_height = (layout.y_bottom_of_bolus - layout.y_bottom_of_glucose - layout.y_pixels_bolus)
            .max(0.0);
        self.rects.clear();
    }

    pub fn draw_point(
        &mut self,
        x: f64,
        point: &mut GraphDataPoint,
        ctx: &DrawContext,
    ) -> Vec<Primitive> {
        let bar_height = point.value * self.pixels_per_unit;
        let bar = Rect::centered_x(x, self.baseline - bar_height, BOLUS_BAR_WIDTH, bar_height);
        let label = Rect::centered_x(x, bar.y - self.label_height, BOLUS_LABEL_WIDTH, self.label_height);
        self.rects.push(bar.union(&label));

        let mut primitives = vec![
            Primitive::rect(bar, Style::BolusBar),
            Primitive::text(label, Style::BolusLabel, format_label(point.value)),
        ];

        if let PointDetail::Bolus {
            extended: Some(extended),
            duration_secs,
        } = &point.detail
        {
            let span = duration_secs * ctx.window.pixels_per_second();
            if *extended > 0.0 && span > 0.0 {
                let height = extended * self.pixels_per_unit;
                primitives.push(Primitive::rect(
                    Rect::new(bar.max_x(), self.baseline - height, span, height),
                    Style::BolusExtended,
                ));
            }
        }
        primitives
    }

    /// Rectangles of bars drawn in the current frame
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }
}
