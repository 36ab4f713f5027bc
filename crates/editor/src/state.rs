use serde::Serialize;
use timeline::{timeline_length, Seconds, Track, TrackId};
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorState {
    pub track_a: Track,
    pub track_b: Track,
    pub playhead: Seconds,
    pub active_track: Option<TrackId>,
    pub is_playing: bool,
    pub is_hovering: bool,
    pub timeline_pixel_width: f32,
}

impl EditorState {
    pub fn new(timeline_pixel_width: f32) -> Self {
        Self {
            track_a: Track::empty(),
            track_b: Track::empty(),
            playhead: 0.0,
            active_track: None,
            is_playing: false,
            is_hovering: false,
            timeline_pixel_width,
        }
    }

    pub fn track(&self, id: TrackId) -> &Track {
        match id { TrackId::A => &self.track_a, TrackId::B => &self.track_b }
    }

    pub fn timeline_length(&self) -> Seconds { timeline_length(&self.track_a, &self.track_b) }

    pub fn phase(&self) -> PlaybackPhase {
        match (self.active_track, self.is_playing) {
            (None, _) => PlaybackPhase::Idle,
            (Some(id), true) => PlaybackPhase::Playing(id),
            (Some(id), false) => PlaybackPhase::Paused(id),
        }
    }
}

/// Coarse synchronizer state derived from the active track and play flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackPhase {
    Idle,
    Playing(TrackId),
    Paused(TrackId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SetTrackA(Track),
    SetTrackB(Track),
    SetPlayhead(Seconds),
    SetActiveTrack(Option<TrackId>),
    SetIsPlaying(bool),
    SetIsHovering(bool),
    SetTimelinePixelWidth(f32),
}

impl Action {
    pub fn set_track(id: TrackId, track: Track) -> Self {
        match id { TrackId::A => Action::SetTrackA(track), TrackId::B => Action::SetTrackB(track) }
    }
}

/// Pure transition: replaces exactly one field.
pub fn reduce(state: &EditorState, action: Action) -> EditorState {
    let mut next = state.clone();
    match action {
        Action::SetTrackA(track) => next.track_a = track,
        Action::SetTrackB(track) => next.track_b = track,
        Action::SetPlayhead(t) => next.playhead = t,
        Action::SetActiveTrack(id) => next.active_track = id,
        Action::SetIsPlaying(playing) => next.is_playing = playing,
        Action::SetIsHovering(hovering) => next.is_hovering = hovering,
        Action::SetTimelinePixelWidth(px) => next.timeline_pixel_width = px,
    }
    next
}

/// Read + dispatch capability handed to the synchronizer and reconciler.
pub trait StoreHandle {
    fn state(&self) -> &EditorState;
    fn dispatch(&mut self, action: Action);
}

#[derive(Debug, Clone)]
pub struct Store {
    state: EditorState,
}

impl Store {
    pub fn new(state: EditorState) -> Self { Self { state } }
}

impl StoreHandle for Store {
    fn state(&self) -> &EditorState { &self.state }

    fn dispatch(&mut self, action: Action) {
        trace!(?action, "dispatch");
        self.state = reduce(&self.state, action);
    }
}
