//! Drawing primitives handed to the renderer

use serde::Serialize;

/// Axis-aligned rectangle in pixel space; `y` grows downward
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size centered horizontally on `center_x`
    pub fn centered_x(center_x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(center_x - width / 2.0, y, width, height)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    /// Strict horizontal overlap; touching edges do not count
    pub fn overlaps_x(&self, other: &Rect) -> bool {
        other.max_x() > self.x && other.x < self.max_x()
    }

    /// Smallest rectangle containing both
    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect::new(
            x,
            y,
            self.max_x().max(other.max_x()) - x,
            self.max_y().max(other.max_y()) - y,
        )
    }
}

/// Shape of a primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Circle,
    Rect,
    Line,
    Text,
}

/// Named fill/stroke style; the renderer owns the actual colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    GlucoseLow,
    GlucoseTarget,
    GlucoseHigh,
    MealMarker,
    MealLabel,
    WizardCircle,
    WizardLabel,
    BolusBar,
    BolusExtended,
    BolusLabel,
    BasalRate,
    BasalTemp,
    WorkoutBand,
    WorkoutLabel,
}

/// One drawable item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Primitive {
    pub shape: Shape,
    pub bounds: Rect,
    pub style: Style,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Primitive {
    pub fn circle(bounds: Rect, style: Style) -> Self {
        Self {
            shape: Shape::Circle,
            bounds,
            style,
            label: None,
        }
    }

    pub fn rect(bounds: Rect, style: Style) -> Self {
        Self {
            shape: Shape::Rect,
            bounds,
            style,
            label: None,
        }
    }

    pub fn line(bounds: Rect, style: Style) -> Self {
        Self {
            shape: Shape::Line,
            bounds,
            style,
            label: None,
        }
    }

    pub fn text(bounds: Rect, style: Style, label: impl Into<String>) -> Self {
        Self {
            shape: Shape::Text,
            bounds,
            style,
            label: Some(label.into()),
        }
    }

    /// Attach a label to a non-text primitive
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Format a value the way graph labels show it: integers without a
/// fractional part, everything else with one decimal
pub fn format_label(value: f64) -> String {
    if (value - value.round()).abs() < 0.05 {
        format!("{}", value.round() as i64)
    } else {
        format!("{:.1}", value)
    }
}
