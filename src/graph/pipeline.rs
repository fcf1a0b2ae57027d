//! Graph rendering pipeline
//!
//! ```text
//! records (sorted by time)
//!    │ load       every layer; may widen max_bolus / max_basal
//!    ▼
//! configure       every layer, against the final layout
//!    │
//!    ▼
//! draw            by draw rank; bolus publishes rects → DrawContext → wizard
//! ```
//!
//! No layer configures before all loads finish, and no layer draws before
//! all configures finish.

use crate::config::GraphConfig;
use crate::error::CoreError;
use crate::graph::layers::{DrawContext, GraphLayer, LayerKind};
use crate::graph::{GraphDataPoint, GraphLayout, Primitive, TimeWindow};
use crate::store::{ClinicalRecord, RecordStore};
use serde::Serialize;

/// Output of one layer
#[derive(Debug, Clone, Serialize)]
pub struct LayerOutput {
    pub kind: LayerKind,
    /// All loaded points, including zero-value ones
    pub points: Vec<GraphDataPoint>,
    pub primitives: Vec<Primitive>,
}

/// A rendered graph
#[derive(Debug, Clone, Serialize)]
pub struct GraphFrame {
    pub window: TimeWindow,
    pub layout: GraphLayout,
    /// Layers in draw order
    pub layers: Vec<LayerOutput>,
}

impl GraphFrame {
    pub fn layer(&self, kind: LayerKind) -> Option<&LayerOutput> {
        self.layers.iter().find(|layer| layer.kind == kind)
    }

    pub fn primitive_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.primitives.len()).sum()
    }
}

/// Renders records into graph frames
#[derive(Debug, Clone, Default)]
pub struct GraphRenderer {
    config: GraphConfig,
}

impl GraphRenderer {
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Run load → configure → draw over `records` for `window`
    pub fn render(&self, records: &[ClinicalRecord], window: TimeWindow, height_px: f64) -> GraphFrame {
        let mut layout = GraphLayout::new(window.width_px, height_px, &self.config);
        let mut layers: Vec<GraphLayer> = LayerKind::all().iter().map(|kind| GraphLayer::new(*kind)).collect();

        // Time order keeps offsets non-decreasing within each layer
        let mut ordered: Vec<&ClinicalRecord> = records.iter().collect();
        ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        let pps = window.pixels_per_second();
        let mut culled = 0usize;
        for record in ordered {
            let kind = LayerKind::for_record(record.record_type());
            let Some(layer) = layers.iter_mut().find(|layer| layer.kind() == kind) else {
                continue;
            };
            let offset = window.time_offset_secs(record.timestamp);
            let x = window.x_for_offset(offset);
            let span_px = record.duration_secs().unwrap_or(0.0) * pps;
            let (left, right) = layer.x_extent(x, span_px);
            if !window.contains_with_margin(left, right) {
                culled += 1;
                continue;
            }
            layer.load_record(record, offset, &mut layout);
        }

        for layer in layers.iter_mut() {
            layer.configure(&layout);
        }

        layers.sort_by_key(|layer| layer.kind().draw_rank());
        let mut ctx = DrawContext::new(window);
        let mut outputs = Vec::with_capacity(layers.len());
        for mut layer in layers {
            let primitives = layer.draw(&ctx);
            if let GraphLayer::Bolus(bolus) = &layer {
                ctx.bolus_rects.extend_from_slice(bolus.rects());
            }
            outputs.push(LayerOutput {
                kind: layer.kind(),
                points: layer.points().to_vec(),
                primitives,
            });
        }

        let frame = GraphFrame {
            window,
            layout,
            layers: outputs,
        };
        tracing::debug!(
            records = records.len(),
            culled,
            primitives = frame.primitive_count(),
            max_bolus = frame.layout.max_bolus,
            "Rendered graph frame"
        );
        frame
    }

    /// Fetch the user's records around `window` and render them
    ///
    /// A failing store renders an empty frame.
    pub async fn render_from_store(
        &self,
        store: &dyn RecordStore,
        user_id: &str,
        window: TimeWindow,
        height_px: f64,
    ) -> GraphFrame {
        // Span-shaped records that started before the window may still reach into it
        let lookback_ms = self.config.lookback_minutes.saturating_mul(60_000);
        let records = match store
            .fetch_range(
                user_id,
                window.start_ms.saturating_sub(lookback_ms),
                window.end_ms(),
            )
            .await
        {
            Ok(records) => records,
            Err(e) => {
                let err = CoreError::from(e);
                tracing::error!(user_id, error = %err, "Rendering empty graph");
                Vec::new()
            }
        };
        self.render(&records, window, height_px)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{PointDetail, Shape, WIZARD_CIRCLE_DIAMETER};
    use crate::store::{MemoryRecordStore, RecordKind};

    const MIN: i64 = 60_000;

    fn window() -> TimeWindow {
        TimeWindow::new(0, 6.0 * 3600.0, 720.0)
    }

    fn wizard(id: &str, ts: i64, carbs: f64, bolus_id: Option<&str>, recommended: Option<f64>) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Wizard {
                carb_input: Some(carbs),
                bolus_id: bolus_id.map(str::to_string),
                recommended_net: recommended,
                notes: None,
            },
        )
    }

    fn bolus(id: &str, ts: i64, normal: f64) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Bolus {
                normal: Some(normal),
                extended: None,
                duration_ms: None,
            },
        )
    }

    fn meal(id: &str, ts: i64, carbs: Option<f64>) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Meal {
                title: Some("Lunch".to_string()),
                notes: None,
                location: None,
                carb_input: carbs,
                photo_urls: vec![],
            },
        )
    }

    fn glucose(id: &str, ts: i64, value: f64) -> ClinicalRecord {
        ClinicalRecord::new(
            id,
            "u1",
            ts,
            RecordKind::Glucose {
                value: Some(value),
                units: Default::default(),
                source: None,
            },
        )
    }

    #[test]
    fn test_wizard_sits_on_its_bolus() {
        let records = vec![
            wizard("w1", 60 * MIN, 45.0, Some("b1"), Some(4.0)),
            bolus("b1", 60 * MIN, 4.0),
        ];
        let frame = GraphRenderer::default().render(&records, window(), 400.0);

        let bolus_layer = frame.layer(LayerKind::Bolus).unwrap();
        let label_top = bolus_layer
            .primitives
            .iter()
            .map(|p| p.bounds.y)
            .fold(f64::INFINITY, f64::min);

        let wizard_layer = frame.layer(LayerKind::Wizard).unwrap();
        let circle = &wizard_layer.primitives[0];
        assert_eq!(circle.shape, Shape::Circle);
        assert_eq!(circle.bounds.height, WIZARD_CIRCLE_DIAMETER);
        assert!((circle.bounds.max_y() - label_top).abs() < 1e-9);

        match &wizard_layer.points[0].detail {
            PointDetail::Wizard { bolus_top_y, .. } => assert!(bolus_top_y.is_some()),
            other => panic!("unexpected detail {:?}", other),
        }
    }

    #[test]
    fn test_bolus_layer_drawn_before_wizard() {
        let frame = GraphRenderer::default().render(&[], window(), 400.0);
        let order: Vec<LayerKind> = frame.layers.iter().map(|l| l.kind).collect();
        let bolus = order.iter().position(|k| *k == LayerKind::Bolus).unwrap();
        let wizard = order.iter().position(|k| *k == LayerKind::Wizard).unwrap();
        assert!(bolus < wizard);
        assert_eq!(order.len(), 6);
    }

    #[test]
    fn test_zero_values_loaded_not_drawn() {
        let records = vec![
            wizard("w0", 30 * MIN, 0.0, None, Some(2.0)),
            meal("m0", 40 * MIN, None),
            meal("m1", 50 * MIN, Some(30.0)),
        ];
        let frame = GraphRenderer::default().render(&records, window(), 400.0);

        let wizard_layer = frame.layer(LayerKind::Wizard).unwrap();
        assert_eq!(wizard_layer.points.len(), 1);
        assert!(wizard_layer.primitives.is_empty());

        let meal_layer = frame.layer(LayerKind::Meal).unwrap();
        assert_eq!(meal_layer.points.len(), 2);
        // line + label for the meal with carbs only
        assert_eq!(meal_layer.primitives.len(), 2);
        assert_eq!(meal_layer.primitives[1].label.as_deref(), Some("30g"));
    }

    #[test]
    fn test_recommendation_widens_bolus_scale() {
        let records = vec![
            bolus("b1", 60 * MIN, 3.0),
            wizard("w1", 90 * MIN, 60.0, None, Some(15.0)),
        ];
        let frame = GraphRenderer::default().render(&records, window(), 400.0);
        assert_eq!(frame.layout.max_bolus, 15.0);

        let bar = &frame.layer(LayerKind::Bolus).unwrap().primitives[0];
        let expected = 3.0 * frame.layout.y_pixels_bolus / 15.0;
        assert!((bar.bounds.height - expected).abs() < 1e-9);
    }

    #[test]
    fn test_offsets_non_decreasing_per_layer() {
        let records: Vec<ClinicalRecord> = [50, 10, 30, 20, 40]
            .iter()
            .map(|m| glucose(&format!("g{}", m), m * MIN, 100.0))
            .collect();
        let frame = GraphRenderer::default().render(&records, window(), 400.0);
        let offsets: Vec<f64> = frame
            .layer(LayerKind::Glucose)
            .unwrap()
            .points
            .iter()
            .map(|p| p.time_offset_secs)
            .collect();
        assert_eq!(offsets.len(), 5);
        assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_records_outside_window_culled() {
        let records = vec![
            glucose("before", -60 * MIN, 100.0),
            glucose("inside", 60 * MIN, 100.0),
            glucose("after", 7 * 60 * MIN, 100.0),
        ];
        let frame = GraphRenderer::default().render(&records, window(), 400.0);
        let glucose_layer = frame.layer(LayerKind::Glucose).unwrap();
        assert_eq!(glucose_layer.points.len(), 1);
        assert_eq!(glucose_layer.points[0].source_record_id, "inside");
    }

    #[tokio::test]
    async fn test_render_from_store() {
        let store = MemoryRecordStore::with_records(vec![
            glucose("g1", 60 * MIN, 110.0),
            bolus("b1", 70 * MIN, 2.0),
        ]);
        let frame = GraphRenderer::default()
            .render_from_store(&store, "u1", window(), 400.0)
            .await;
        assert_eq!(frame.layer(LayerKind::Glucose).unwrap().points.len(), 1);
        assert_eq!(frame.layer(LayerKind::Bolus).unwrap().primitives.len(), 2);

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["layers"][0]["kind"], "basal");
    }

    #[tokio::test]
    async fn test_render_from_store_at_range_limits() {
        let store = MemoryRecordStore::with_records(vec![glucose("g1", 60 * MIN, 110.0)]);
        let renderer = GraphRenderer::default();

        for start in [i64::MIN, i64::MAX] {
            let window = TimeWindow::new(start, 6.0 * 3600.0, 720.0);
            let frame = renderer.render_from_store(&store, "u1", window, 400.0).await;
            assert_eq!(frame.primitive_count(), 0);
        }
    }
}
