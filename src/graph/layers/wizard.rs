use super::{mismatch, DrawContext};
use crate::error::CoreError;
use crate::graph::{format_label, GraphDataPoint, GraphLayout, PointDetail, Primitive, Rect, Style};
use crate::store::{ClinicalRecord, RecordKind};

/// Diameter of the carb circle drawn for a wizard entry
pub const WIZARD_CIRCLE_DIAMETER: f64 = 31.0;

/// Bolus calculator entries: a carb circle resting on the bolus it produced
#[derive(Debug, Clone, Default)]
pub struct WizardLayer {
    pub(crate) points: Vec<GraphDataPoint>,
    y_bottom: f64,
}

impl WizardLayer {
    pub fn nominal_pixel_width(&self) -> f64 {
        WIZARD_CIRCLE_DIAMETER
    }

    /// Load a wizard entry. Its recommended bolus widens the bolus scale.
    pub fn load_record(
        &mut self,
        record: &ClinicalRecord,
        time_offset_secs: f64,
        layout: &mut GraphLayout,
    ) -> Result<(), CoreError> {
        let RecordKind::Wizard {
            carb_input,
            bolus_id,
            recommended_net,
            ..
        } = &record.kind
        else {
            return Err(mismatch("wizard", record));
        };

        if let Some(recommended) = recommended_net {
            layout.widen_bolus(*recommended);
        }
        self.points.push(GraphDataPoint::new(
            record.id.clone(),
            carb_input.unwrap_or(0.0).round(),
            time_offset_secs,
            PointDetail::Wizard {
                bolus_id: bolus_id.clone(),
                recommended_net: *recommended_net,
                bolus_top_y: None,
            },
        ));
        Ok(())
    }

    pub fn configure(&mut self, layout: &GraphLayout) {
        self.y_bottom = layout.y_bottom_of_wizard;
    }

    /// Draw the circle centered on `x`, lifted onto the tallest bolus under it
    pub fn draw_point(
        &mut self,
        x: f64,
        point: &mut GraphDataPoint,
        ctx: &DrawContext,
    ) -> Vec<Primitive> {
        let mut circle = Rect::centered_x(
            x,
            self.y_bottom - WIZARD_CIRCLE_DIAMETER,
            WIZARD_CIRCLE_DIAMETER,
            WIZARD_CIRCLE_DIAMETER,
        );

        if let PointDetail::Wizard { bolus_top_y, .. } = &mut point.detail {
            if bolus_top_y.is_none() {
                *bolus_top_y = bolus_top_at(&circle, &ctx.bolus_rects);
            }
            if let Some(top) = *bolus_top_y {
                circle.y = top - WIZARD_CIRCLE_DIAMETER;
            }
        }

        vec![Primitive::circle(circle, Style::WizardCircle).with_label(format_label(point.value))]
    }
}

/// Nil-aware "greater than": absent is less than any present value
pub fn nil_aware_gt(lhs: Option<f64>, rhs: Option<f64>) -> bool {
    match (lhs, rhs) {
        (Some(l), Some(r)) => l > r,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Top y of the tallest bolus rectangle horizontally overlapping `target`
pub fn bolus_top_at(target: &Rect, bolus_rects: &[Rect]) -> Option<f64> {
    let mut tallest: Option<&Rect> = None;
    for rect in bolus_rects.iter().filter(|rect| rect.overlaps_x(target)) {
        if nil_aware_gt(Some(rect.height), tallest.map(|t| t.height)) {
            tallest = Some(rect);
        }
    }
    tallest.map(|rect| rect.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GraphConfig;
    use crate::graph::TimeWindow;

    const BASELINE: f64 = 100.0;

    fn bar(left: f64, right: f64, height: f64) -> Rect {
        Rect::new(left, BASELINE - height, right - left, height)
    }

    fn wizard(id: &str, carbs: Option<f64>, recommended: Option<f64>) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            0,
            RecordKind::Wizard {
                carb_input: carbs,
                bolus_id: None,
                recommended_net: recommended,
                notes: None,
            },
        )
    }

    #[test]
    fn test_tallest_intersecting_bolus_wins() {
        let rects = vec![bar(10.0, 20.0, 5.0), bar(15.0, 25.0, 8.0)];
        let candidate = Rect::new(12.0, 0.0, 10.0, 10.0);
        assert_eq!(bolus_top_at(&candidate, &rects), Some(BASELINE - 8.0));
    }

    #[test]
    fn test_non_intersecting_bolus_ignored() {
        let rects = vec![bar(10.0, 20.0, 5.0), bar(40.0, 50.0, 30.0)];
        let candidate = Rect::new(12.0, 0.0, 10.0, 10.0);
        assert_eq!(bolus_top_at(&candidate, &rects), Some(BASELINE - 5.0));
        assert_eq!(bolus_top_at(&Rect::new(60.0, 0.0, 5.0, 5.0), &rects), None);
        assert_eq!(bolus_top_at(&candidate, &[]), None);
    }

    #[test]
    fn test_nil_aware_gt() {
        assert!(nil_aware_gt(Some(1.0), None));
        assert!(nil_aware_gt(Some(2.0), Some(1.0)));
        assert!(!nil_aware_gt(None, Some(1.0)));
        assert!(!nil_aware_gt(None, None));
        assert!(!nil_aware_gt(Some(1.0), Some(1.0)));
    }

    #[test]
    fn test_circle_rests_on_bolus() {
        let layout = GraphLayout::new(800.0, 400.0, &GraphConfig::default());
        let mut layer = WizardLayer::default();
        layer.configure(&layout);

        let mut ctx = DrawContext::new(TimeWindow::new(0, 3600.0, 800.0));
        ctx.bolus_rects = vec![bar(95.0, 109.0, 40.0)];

        let mut point = GraphDataPoint::new(
            "w1",
            45.0,
            0.0,
            PointDetail::Wizard {
                bolus_id: None,
                recommended_net: None,
                bolus_top_y: None,
            },
        );
        let circle = layer.draw_point(100.0, &mut point, &ctx)[0].clone();
        assert_eq!(circle.bounds.max_y(), BASELINE - 40.0);
        assert_eq!(circle.label.as_deref(), Some("45"));
        assert!(matches!(
            point.detail,
            PointDetail::Wizard { bolus_top_y: Some(y), .. } if y == BASELINE - 40.0
        ));

        // No bolus under it: default slot
        let mut lone = point.clone();
        lone.detail = PointDetail::Wizard {
            bolus_id: None,
            recommended_net: None,
            bolus_top_y: None,
        };
        let circle = layer.draw_point(400.0, &mut lone, &ctx)[0].clone();
        assert_eq!(circle.bounds.max_y(), layout.y_bottom_of_wizard);
    }

    #[test]
    fn test_recommendation_widens_bolus_scale() {
        let mut layout = GraphLayout::new(800.0, 400.0, &GraphConfig::default());
        let mut layer = WizardLayer::default();
        layer
            .load_record(&wizard("w1", None, Some(22.5)), 0.0, &mut layout)
            .unwrap();
        assert_eq!(layout.max_bolus, 22.5);
        assert!(layer.points[0].is_zero());
    }
}
