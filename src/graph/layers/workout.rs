use super::{mismatch, DrawContext};
use crate::error::CoreError;
use crate::graph::{GraphDataPoint, GraphLayout, PointDetail, Primitive, Rect, Style};
use crate::store::{ClinicalRecord, RecordKind};

/// Workouts: bands in the header spanning the workout's duration
#[derive(Debug, Clone, Default)]
pub struct WorkoutLayer {
    pub(crate) points: Vec<GraphDataPoint>,
    y_top: f64,
    band_height: f64,
}

impl WorkoutLayer {
    pub fn nominal_pixel_width(&self) -> f64 {
        1.0
    }

    /// The primary value of a workout is its duration in seconds
    pub fn load_record(
        &mut self,
        record: &ClinicalRecord,
        time_offset_secs: f64,
        _layout: &mut GraphLayout,
    ) -> Result<(), CoreError> {
        let RecordKind::Workout {
            duration_secs,
            title,
            ..
        } = &record.kind
        else {
            return Err(mismatch("workout", record));
        };
        let duration = duration_secs.unwrap_or(0.0).max(0.0);
        self.points.push(GraphDataPoint::new(
            record.id.clone(),
            duration,
            time_offset_secs,
            PointDetail::Workout {
                duration_secs: duration,
                title: title.clone(),
            },
        ));
        Ok(())
    }

    pub fn configure(&mut self, layout: &GraphLayout) {
        self.y_top = layout.y_top_of_workout;
        self.band_height = layout.y_bottom_of_workout - layout.y_top_of_workout;
    }

    pub fn draw_point(
        &mut self,
        x: f64,
        point: &mut GraphDataPoint,
        ctx: &DrawContext,
    ) -> Vec<Primitive> {
        let width = (point.value * ctx.window.pixels_per_second()).max(1.0);
        let band = Primitive::rect(
            Rect::new(x, self.y_top, width, self.band_height),
            Style::WorkoutBand,
        );
        match &point.detail {
            PointDetail::Workout {
                title: Some(title), ..
            } => vec![
                band.clone(),
                Primitive::text(band.bounds, Style::WorkoutLabel, title.clone()),
            ],
            _ => vec![band],
        }
    }
}
