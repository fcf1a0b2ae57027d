use super::{mismatch, DrawContext};
use crate::error::CoreError;
use crate::graph::{format_label, GraphDataPoint, GraphLayout, PointDetail, Primitive, Rect, Style};
use crate::store::{ClinicalRecord, RecordKind};

const MEAL_LINE_WIDTH: f64 = 2.0;
const MEAL_LABEL_WIDTH: f64 = 30.0;

/// Meal markers: a vertical line across the graph with a carb label on top
#[derive(Debug, Clone, Default)]
pub struct MealLayer {
    pub(crate) points: Vec<GraphDataPoint>,
    y_top: f64,
    y_bottom: f64,
    label_height: f64,
}

impl MealLayer {
    pub fn nominal_pixel_width(&self) -> f64 {
        MEAL_LABEL_WIDTH
    }

    pub fn load_record(
        &mut self,
        record: &ClinicalRecord,
        time_offset_secs: f64,
        _layout: &mut GraphLayout,
    ) -> Result<(), CoreError> {
        let RecordKind::Meal { carb_input, title, .. } = &record.kind else {
            return Err(mismatch("meal", record));
        };
        self.points.push(GraphDataPoint::new(
            record.id.clone(),
            carb_input.unwrap_or(0.0),
            time_offset_secs,
            PointDetail::Meal {
                title: title.clone(),
            },
        ));
        Ok(())
    }

    pub fn configure(&mut self, layout: &GraphLayout) {
        self.y_top = layout.y_top_of_meal;
        self.y_bottom = layout.y_bottom_of_meal;
        self.label_height = layout.y_bottom_of_workout - layout.y_top_of_workout;
    }

    pub fn draw_point(
        &mut self,
        x: f64,
        point: &mut GraphDataPoint,
        _ctx: &DrawContext,
    ) -> Vec<Primitive> {
        let mut line = Primitive::line(
            Rect::centered_x(x, self.y_top, MEAL_LINE_WIDTH, self.y_bottom - self.y_top),
            Style::MealMarker,
        );
        if let PointDetail::Meal { title: Some(title) } = &point.detail {
            line = line.with_label(title.clone());
        }
        let label = Primitive::text(
            Rect::centered_x(x, self.y_top, MEAL_LABEL_WIDTH, self.label_height),
            Style::MealLabel,
            format!("{}g", format_label(point.value)),
        );
        vec![line, label]
    }
}
