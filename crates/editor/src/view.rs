//! Render model for the presentation layer, derived fresh from state.

use serde::Serialize;
use timeline::geometry::{format_clock, format_duration_label};
use timeline::{Seconds, TimelineGeometry, TrackId};

use crate::config::EditorConfig;
use crate::drag::DragReconciler;
use crate::state::EditorState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackBarView {
    pub track: TrackId,
    pub left_px: f32,
    pub width_px: f32,
    pub label: String,
    pub duration_label: String,
    pub label_inside: bool,
    pub dragging: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineView {
    pub bars: Vec<TrackBarView>,
    pub playhead_px: f32,
    pub scale: f64,
    pub progress: f64,
    pub total_label: String,
    pub scrub_max: Seconds,
    pub scrub_step: f64,
    /// Track whose element the preview shows.
    pub preview: Option<TrackId>,
    pub controls_visible: bool,
    pub is_playing: bool,
}

impl TimelineView {
    pub fn build(state: &EditorState, drag: &DragReconciler, config: &EditorConfig) -> Self {
        let geometry = TimelineGeometry::for_tracks(state.timeline_pixel_width, &state.track_a, &state.track_b);
        let preview_drag = drag.preview_left_px(state);
        let bars = TrackId::ALL
            .iter()
            .filter(|id| state.track(**id).is_loaded())
            .map(|&id| {
                let track = state.track(id);
                let dragged = preview_drag.filter(|(t, _)| *t == id);
                TrackBarView {
                    track: id,
                    left_px: dragged.map(|(_, x)| x).unwrap_or_else(|| geometry.bar_left_px(track)),
                    width_px: geometry.bar_width_px(track),
                    label: track.display_name().to_string(),
                    duration_label: format_duration_label(track.duration),
                    label_inside: geometry.show_label_inside(track, config.min_label_width_px),
                    dragging: dragged.is_some(),
                }
            })
            .collect();
        let length = geometry.length;
        Self {
            bars,
            playhead_px: geometry.playhead_px(state.playhead),
            scale: geometry.scale(),
            progress: geometry.progress(state.playhead),
            total_label: format_clock(length),
            scrub_max: length,
            scrub_step: config.scrub_step,
            preview: state.active_track,
            controls_visible: state.active_track.is_some() && (!state.is_playing || state.is_hovering),
            is_playing: state.is_playing,
        }
    }
}
