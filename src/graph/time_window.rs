//! Time-window coordinate mapping
//!
//! Maps absolute timestamps to horizontal pixel offsets inside the visible
//! window. Nothing is clamped here; layers decide what to skip.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pixel offset of `timestamp_secs` relative to `window_start_secs`
///
/// A pure linear transform; timestamps before the window give negative
/// offsets.
pub fn offset_for(timestamp_secs: f64, window_start_secs: f64, pixels_per_second: f64) -> f64 {
    (timestamp_secs - window_start_secs) * pixels_per_second
}

/// Visible time window of the graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    /// Window start (ms since epoch)
    pub start_ms: i64,
    /// Window length in seconds
    pub duration_secs: f64,
    /// Width of the drawing area in pixels
    pub width_px: f64,
}

impl TimeWindow {
    pub fn new(start_ms: i64, duration_secs: f64, width_px: f64) -> Self {
        Self {
            start_ms,
            duration_secs,
            width_px,
        }
    }

    /// Window of `hours` ending at `end`
    pub fn ending_at(end: DateTime<Utc>, hours: f64, width_px: f64) -> Self {
        let duration_secs = hours * 3600.0;
        let start_ms = end
            .timestamp_millis()
            .saturating_sub((duration_secs * 1000.0) as i64);
        Self::new(start_ms, duration_secs, width_px)
    }

    /// Window end; saturates at the ends of the i64 range
    pub fn end_ms(&self) -> i64 {
        self.start_ms
            .saturating_add((self.duration_secs * 1000.0) as i64)
    }

    pub fn start_secs(&self) -> f64 {
        self.start_ms as f64 / 1000.0
    }

    /// Horizontal scale; an empty window maps everything to 0
    pub fn pixels_per_second(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.width_px / self.duration_secs
        } else {
            0.0
        }
    }

    /// Seconds from the window start to `timestamp_ms`
    pub fn time_offset_secs(&self, timestamp_ms: i64) -> f64 {
        timestamp_ms.saturating_sub(self.start_ms) as f64 / 1000.0
    }

    /// Pixel x for a time offset in seconds
    pub fn x_for_offset(&self, time_offset_secs: f64) -> f64 {
        offset_for(time_offset_secs, 0.0, self.pixels_per_second())
    }

    /// Pixel x for an absolute timestamp
    pub fn x_for_timestamp(&self, timestamp_ms: i64) -> f64 {
        offset_for(
            timestamp_ms as f64 / 1000.0,
            self.start_secs(),
            self.pixels_per_second(),
        )
    }

    /// True if the span `[left, right]` intersects the drawing area
    pub fn contains_with_margin(&self, left: f64, right: f64) -> bool {
        right >= 0.0 && left <= self.width_px
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_offset_for_is_linear() {
        assert_eq!(offset_for(100.0, 100.0, 2.0), 0.0);
        assert_eq!(offset_for(150.0, 100.0, 2.0), 100.0);
        assert_eq!(offset_for(50.0, 100.0, 2.0), -100.0);
    }

    #[test]
    fn test_offsets_monotonic() {
        let window = TimeWindow::new(1_000_000, 3600.0, 720.0);
        let mut last = f64::NEG_INFINITY;
        for ts in (0..20).map(|i| 1_000_000 + i * 250_000) {
            let x = window.x_for_timestamp(ts);
            assert!(x >= last);
            last = x;
        }
    }

    #[test]
    fn test_x_for_offset_matches_timestamp() {
        let window = TimeWindow::new(0, 3600.0, 720.0);
        assert!((window.pixels_per_second() - 0.2).abs() < 1e-9);
        let ts = 1_800_000;
        assert!((window.x_for_offset(window.time_offset_secs(ts)) - 360.0).abs() < 1e-9);
        assert!((window.x_for_timestamp(ts) - 360.0).abs() < 1e-9);
    }

    #[test]
    fn test_extreme_start_saturates() {
        let late = TimeWindow::new(i64::MAX, 3600.0, 800.0);
        assert_eq!(late.end_ms(), i64::MAX);
        assert!(late.time_offset_secs(0) < 0.0);

        let early = TimeWindow::new(i64::MIN, 3600.0, 800.0);
        assert!(early.end_ms() > i64::MIN);
        assert!(early.time_offset_secs(i64::MAX) > 0.0);
    }

    #[test]
    fn test_ending_at() {
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let window = TimeWindow::ending_at(end, 6.0, 600.0);
        assert_eq!(window.end_ms(), end.timestamp_millis());
        assert_eq!(window.duration_secs, 21600.0);
    }

    #[test]
    fn test_margin_and_empty_window() {
        let window = TimeWindow::new(0, 100.0, 500.0);
        assert!(window.contains_with_margin(-10.0, 5.0));
        assert!(!window.contains_with_margin(-20.0, -1.0));
        assert!(!window.contains_with_margin(501.0, 520.0));
        assert_eq!(TimeWindow::new(0, 0.0, 500.0).pixels_per_second(), 0.0);
    }
}
