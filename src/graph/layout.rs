//! Vertical layout shared by all layers
//!
//! ```text
//! 0 ─────────── workout band / meal labels
//!   ─────────── glucose band
//!   ─────────── wizard + bolus band (bars stand on y_bottom_of_bolus)
//!   ─────────── basal band (bars stand on y_bottom_of_basal)
//! height
//! ```
//!
//! Layers read the bands during configure and draw. The load phase may only
//! widen `max_bolus` and `max_basal`.

use crate::config::GraphConfig;
use serde::Serialize;

const HEADER_FRACTION: f64 = 0.10;
const GLUCOSE_FRACTION: f64 = 0.50;
const BOLUS_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphLayout {
    pub width_px: f64,
    pub height_px: f64,

    pub y_top_of_workout: f64,
    pub y_bottom_of_workout: f64,

    pub y_top_of_meal: f64,
    pub y_bottom_of_meal: f64,

    pub y_top_of_glucose: f64,
    pub y_bottom_of_glucose: f64,
    pub y_pixels_glucose: f64,
    pub glucose_low_mgdl: f64,
    pub glucose_high_mgdl: f64,
    pub glucose_range_mgdl: f64,

    /// Default bottom of a wizard circle with no bolus under it
    pub y_bottom_of_wizard: f64,
    pub y_bottom_of_bolus: f64,
    pub y_pixels_bolus: f64,
    /// Largest bolus magnitude seen during load
    pub max_bolus: f64,

    pub y_top_of_basal: f64,
    pub y_bottom_of_basal: f64,
    pub y_pixels_basal: f64,
    /// Largest basal rate seen during load
    pub max_basal: f64,
}

impl GraphLayout {
    pub fn new(width_px: f64, height_px: f64, config: &GraphConfig) -> Self {
        let header = height_px * HEADER_FRACTION;
        let glucose_bottom = header + height_px * GLUCOSE_FRACTION;
        let bolus_bottom = glucose_bottom + height_px * BOLUS_FRACTION;
        // Labels and circles need room above the tallest bar
        let bolus_pixels = (bolus_bottom - glucose_bottom - config.label_height_px).max(0.0);

        Self {
            width_px,
            height_px,
            y_top_of_workout: 0.0,
            y_bottom_of_workout: header,
            y_top_of_meal: 0.0,
            y_bottom_of_meal: height_px,
            y_top_of_glucose: header,
            y_bottom_of_glucose: glucose_bottom,
            y_pixels_glucose: glucose_bottom - header,
            glucose_low_mgdl: config.glucose_low_mgdl,
            glucose_high_mgdl: config.glucose_high_mgdl,
            glucose_range_mgdl: config.glucose_range_mgdl,
            y_bottom_of_wizard: bolus_bottom,
            y_bottom_of_bolus: bolus_bottom,
            y_pixels_bolus: bolus_pixels,
            max_bolus: config.min_bolus_scale,
            y_top_of_basal: bolus_bottom,
            y_bottom_of_basal: height_px,
            y_pixels_basal: height_px - bolus_bottom,
            max_basal: config.min_basal_scale,
        }
    }

    /// Widen the bolus scale to cover `value`
    pub fn widen_bolus(&mut self, value: f64) {
        if value > self.max_bolus {
            self.max_bolus = value;
        }
    }

    /// Widen the basal scale to cover `rate`
    pub fn widen_basal(&mut self, rate: f64) {
        if rate > self.max_basal {
            self.max_basal = rate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_stacked() {
        let layout = GraphLayout::new(800.0, 400.0, &GraphConfig::default());
        assert!(layout.y_bottom_of_workout <= layout.y_top_of_glucose);
        assert!(layout.y_bottom_of_glucose < layout.y_bottom_of_bolus);
        assert_eq!(layout.y_top_of_basal, layout.y_bottom_of_bolus);
        assert_eq!(layout.y_bottom_of_basal, 400.0);
        assert_eq!(layout.y_bottom_of_wizard, layout.y_bottom_of_bolus);
    }

    #[test]
    fn test_widen_only_grows() {
        let mut layout = GraphLayout::new(800.0, 400.0, &GraphConfig::default());
        let initial = layout.max_bolus;
        layout.widen_bolus(initial + 3.0);
        layout.widen_bolus(1.0);
        assert_eq!(layout.max_bolus, initial + 3.0);

        layout.widen_basal(0.1);
        assert_eq!(layout.max_basal, GraphConfig::default().min_basal_scale);
    }
}
