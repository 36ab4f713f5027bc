use timeline::{Seconds, TimelineGeometry, Track, TrackId};
use tracing::{debug, warn};

use crate::state::{Action, EditorState, StoreHandle};

/// A drag in progress. `delta_px` is cumulative from the drag start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragState {
    pub track: TrackId,
    pub delta_px: f32,
}

/// Turns pixel deltas from the drag source into committed track starts.
/// Intermediate frames only move the bar visually; the store changes once,
/// when the drag ends.
#[derive(Debug, Default)]
pub struct DragReconciler {
    drag: Option<DragState>,
}

impl DragReconciler {
    pub fn new() -> Self { Self::default() }

    /// Start dragging `track`. Unloaded tracks cannot be dragged.
    pub fn begin(&mut self, state: &EditorState, track: TrackId) -> bool {
        if !state.track(track).is_loaded() {
            self.drag = None;
            return false;
        }
        self.drag = Some(DragState { track, delta_px: 0.0 });
        true
    }

    pub fn update(&mut self, delta_px: f32) {
        if let Some(drag) = &mut self.drag { drag.delta_px = delta_px; }
    }

    pub fn current(&self) -> Option<DragState> { self.drag }

    pub fn cancel(&mut self) { self.drag = None; }

    /// Where the dragged bar should be drawn this frame.
    pub fn preview_left_px(&self, state: &EditorState) -> Option<(TrackId, f32)> {
        let drag = self.drag?;
        let geometry = TimelineGeometry::for_tracks(state.timeline_pixel_width, &state.track_a, &state.track_b);
        Some((drag.track, geometry.drag_preview_left_px(state.track(drag.track), drag.delta_px)))
    }

    /// Finish the drag with its final cumulative delta and commit the new start.
    pub fn end<S: StoreHandle>(&mut self, store: &mut S, delta_px: f32) -> Option<Track> {
        let drag = self.drag.take()?;
        commit_drag(store, drag.track, delta_px)
    }
}

/// New start for `track` moved by `delta_px`, kept inside the timeline.
pub fn reconciled_start(track: &Track, delta_px: f32, geometry: &TimelineGeometry) -> Option<Seconds> {
    if !track.is_loaded() { return None; }
    let delta = geometry.seconds_of(delta_px)?;
    let max_start = (geometry.length - track.duration).max(0.0);
    Some((track.start + delta).clamp(0.0, max_start))
}

pub fn commit_drag<S: StoreHandle>(store: &mut S, id: TrackId, delta_px: f32) -> Option<Track> {
    let state = store.state();
    let geometry = TimelineGeometry::for_tracks(state.timeline_pixel_width, &state.track_a, &state.track_b);
    let track = state.track(id);
    let start = reconciled_start(track, delta_px, &geometry)?;
    let moved = match track.with_start(start) {
        Ok(t) => t,
        Err(err) => {
            warn!(track = %id, delta_px, %err, "drag produced an unusable start");
            return None;
        }
    };
    debug!(track = %id, from = track.start, to = start, "drag committed");
    store.dispatch(Action::set_track(id, moved.clone()));
    Some(moved)
}
