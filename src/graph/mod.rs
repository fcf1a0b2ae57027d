//! Time-series graph model
//!
//! Turns clinical records into per-layer drawable primitives for a visible
//! time window. Rendering the primitives is left to the caller.

pub mod data_point;
pub mod geometry;
pub mod layers;
pub mod layout;
pub mod pipeline;
pub mod time_window;

pub use data_point::{GraphDataPoint, PointDetail};
pub use geometry::{format_label, Primitive, Rect, Shape, Style};
pub use layers::{
    bolus_top_at, nil_aware_gt, DrawContext, GraphLayer, LayerKind, BOLUS_BAR_WIDTH,
    WIZARD_CIRCLE_DIAMETER,
};
pub use layout::GraphLayout;
pub use pipeline::{GraphFrame, GraphRenderer, LayerOutput};
pub use time_window::{offset_for, TimeWindow};
