//! Time <-> pixel mapping for the timeline strip.
//!
//! Recomputed from state on every render; holds no state of its own.

use crate::{timeline_length, Seconds, Track};

/// Bars narrower than this render their label outside.
pub const MIN_LABEL_WIDTH_PX: f32 = 90.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineGeometry {
    pub width_px: f32,
    pub length: Seconds,
    scale: f64,
}

impl TimelineGeometry {
    pub fn new(width_px: f32, length: Seconds) -> Self {
        let scale = if length > 0.0 && width_px.is_finite() { width_px as f64 / length } else { 0.0 };
        Self { width_px, length, scale }
    }

    pub fn for_tracks(width_px: f32, a: &Track, b: &Track) -> Self { Self::new(width_px, timeline_length(a, b)) }

    /// Pixels per second; 0 when the timeline is empty.
    pub fn scale(&self) -> f64 { self.scale }

    pub fn has_scale(&self) -> bool { self.scale > 0.0 }

    pub fn pixel_of(&self, t: Seconds) -> f32 { (t * self.scale) as f32 }

    pub fn seconds_of(&self, px: f32) -> Option<Seconds> {
        if !self.has_scale() { return None; }
        Some(px as f64 / self.scale)
    }

    pub fn bar_left_px(&self, track: &Track) -> f32 { self.pixel_of(track.start) }

    pub fn bar_width_px(&self, track: &Track) -> f32 { self.pixel_of(track.duration) }

    pub fn show_label_inside(&self, track: &Track, min_width_px: f32) -> bool {
        !track.is_loaded() || self.bar_width_px(track) > min_width_px
    }

    /// Left edge of a bar while it is being dragged; never committed.
    pub fn drag_preview_left_px(&self, track: &Track, dx: f32) -> f32 {
        let left = self.bar_left_px(track) + dx;
        let max_left = (self.width_px - self.bar_width_px(track)).max(0.0);
        left.clamp(0.0, max_left)
    }

    pub fn playhead_px(&self, playhead: Seconds) -> f32 { self.pixel_of(playhead) - 1.0 }

    pub fn progress(&self, playhead: Seconds) -> f64 {
        if self.length > 0.0 { (playhead / self.length).clamp(0.0, 1.0) } else { 0.0 }
    }
}

pub fn format_duration_label(duration: Seconds) -> String { format!("{:.1}s", duration) }

/// `m:ss`, rounded to whole seconds.
pub fn format_clock(t: Seconds) -> String {
    let total = if t.is_finite() && t > 0.0 { t.round() as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}
