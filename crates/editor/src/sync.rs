//! Playback synchronizer.
//!
//! Reconciles the single logical playhead in the store with the two host
//! media elements. It is the only component that issues play, pause or seek
//! commands, and it listens to exactly one element at a time: the active one.
//!
//! The play flag mirrors the bound element. Commands are fire-and-forget;
//! a `Play` event from the element, or finding the element already running,
//! is what turns the flag on. The flag is only cleared directly when nothing
//! can report it (no active track, a rejected play, an explicit pause).

use media::{MediaClock, MediaElement, MediaEvent};
use timeline::{active_track_at, Seconds, Track, TrackId};
use tracing::{debug, trace, warn};

use crate::state::{Action, StoreHandle};

/// Media-time drift tolerated before a layout change re-seeks the active element.
const SEEK_EPSILON: Seconds = 1e-3;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Reseek { Always, IfDrifted, Never }

pub struct Synchronizer<M: MediaElement> {
    media_a: M,
    media_b: M,
    bound: Option<TrackId>,
}

impl<M: MediaElement> Synchronizer<M> {
    pub fn new(media_a: M, media_b: M) -> Self { Self { media_a, media_b, bound: None } }

    pub fn media(&self, id: TrackId) -> &M {
        match id { TrackId::A => &self.media_a, TrackId::B => &self.media_b }
    }

    #[cfg(test)]
    pub(crate) fn media_mut(&mut self, id: TrackId) -> &mut M { self.element(id) }

    /// Step the clock of the listened-to element only.
    pub fn advance_clock(&mut self, dt: Seconds)
    where
        M: MediaClock,
    {
        if let Some(id) = self.bound { self.element(id).advance(dt); }
    }

    /// The element currently listened to.
    pub fn bound(&self) -> Option<TrackId> { self.bound }

    fn element(&mut self, id: TrackId) -> &mut M {
        match id { TrackId::A => &mut self.media_a, TrackId::B => &mut self.media_b }
    }

    /// Point the slot's element at a newly committed track. Call before the
    /// track lands in the store, then [`Synchronizer::reconcile`].
    pub fn load_source<S: StoreHandle>(&mut self, store: &mut S, id: TrackId, track: &Track) {
        if self.bound == Some(id) {
            debug!(track = %id, "reloading active track; stopping playback");
            self.bind(None);
            if store.state().active_track == Some(id) { store.dispatch(Action::SetActiveTrack(None)); }
            if store.state().is_playing { store.dispatch(Action::SetIsPlaying(false)); }
        }
        let el = self.element(id);
        match &track.source {
            Some(source) => el.load(source, track.duration),
            None => el.unload(),
        }
    }

    /// User scrub to `t`. `t` must already be clamped to the timeline.
    pub fn scrub<S: StoreHandle>(&mut self, store: &mut S, t: Seconds) {
        let state = store.state();
        let next = active_track_at(&state.track_a, &state.track_b, t);
        if t == state.playhead && next == state.active_track && next == self.bound {
            trace!(t, "scrub to current playhead ignored");
            return;
        }
        store.dispatch(Action::SetPlayhead(t));
        self.follow_playhead(store, t, Reseek::Always);
    }

    /// Re-evaluate the active track after tracks moved or were replaced.
    pub fn reconcile<S: StoreHandle>(&mut self, store: &mut S) {
        let state = store.state();
        let len = state.timeline_length();
        let t = state.playhead.clamp(0.0, len);
        if t != state.playhead { store.dispatch(Action::SetPlayhead(t)); }
        self.follow_playhead(store, t, Reseek::IfDrifted);
    }

    pub fn toggle<S: StoreHandle>(&mut self, store: &mut S) {
        if store.state().is_playing { self.pause(store) } else { self.play(store) }
    }

    pub fn play<S: StoreHandle>(&mut self, store: &mut S) {
        let state = store.state();
        if let Some(id) = state.active_track {
            self.bind(Some(id));
            self.request_play(store, id);
            return;
        }
        let t = state.playhead;
        let Some(id) = active_track_at(&state.track_a, &state.track_b, t) else {
            debug!(t, "play requested outside any track window");
            return;
        };
        store.dispatch(Action::SetActiveTrack(Some(id)));
        self.bind(Some(id));
        self.seek(store, id, t);
        self.request_play(store, id);
    }

    pub fn pause<S: StoreHandle>(&mut self, store: &mut S) {
        if let Some(id) = self.bound { self.element(id).pause(); }
        if store.state().is_playing { store.dispatch(Action::SetIsPlaying(false)); }
    }

    /// Drain and apply events from both elements. Returns how many were seen.
    pub fn poll<S: StoreHandle>(&mut self, store: &mut S) -> usize {
        let mut seen = 0;
        for id in TrackId::ALL {
            let events = self.element(id).drain_events();
            seen += events.len();
            for event in events { self.handle_event(store, id, event); }
        }
        seen
    }

    pub fn handle_event<S: StoreHandle>(&mut self, store: &mut S, id: TrackId, event: MediaEvent) {
        if self.bound != Some(id) {
            trace!(track = %id, ?event, "event from unbound element dropped");
            return;
        }
        match event {
            MediaEvent::TimeUpdate => self.on_time_update(store, id),
            MediaEvent::Play => {
                if !store.state().is_playing { store.dispatch(Action::SetIsPlaying(true)); }
            }
            MediaEvent::Pause => {
                if store.state().is_playing { store.dispatch(Action::SetIsPlaying(false)); }
            }
            MediaEvent::Ended => self.on_ended(store, id),
        }
    }

    fn on_time_update<S: StoreHandle>(&mut self, store: &mut S, id: TrackId) {
        let state = store.state();
        if !state.is_playing || state.active_track != Some(id) { return; }
        let t = self.timeline_time(store, id);
        if t != store.state().playhead { store.dispatch(Action::SetPlayhead(t)); }
        self.follow_playhead(store, t, Reseek::Never);
    }

    fn on_ended<S: StoreHandle>(&mut self, store: &mut S, id: TrackId) {
        // The element stopped at its own end; the playhead may lag the last timeupdate.
        let t = self.timeline_time(store, id);
        if t != store.state().playhead { store.dispatch(Action::SetPlayhead(t)); }

        let state = store.state();
        let next = if id != TrackId::B && state.track_b.contains(t) {
            Some(TrackId::B)
        } else if id != TrackId::A && state.track_a.contains(t) {
            Some(TrackId::A)
        } else {
            None
        };
        debug!(ended = %id, next = ?next, t, "media ended");
        if store.state().active_track != next { store.dispatch(Action::SetActiveTrack(next)); }
        self.bind(next);
        match next {
            Some(next) => {
                self.seek(store, next, t);
                self.request_play(store, next);
            }
            None => {
                if store.state().is_playing { store.dispatch(Action::SetIsPlaying(false)); }
            }
        }
    }

    fn follow_playhead<S: StoreHandle>(&mut self, store: &mut S, t: Seconds, reseek: Reseek) {
        let state = store.state();
        let next = active_track_at(&state.track_a, &state.track_b, t);
        let playing = state.is_playing;

        if next != state.active_track || next != self.bound {
            debug!(from = ?state.active_track, to = ?next, t, playing, "active track changed");
            if state.active_track != next { store.dispatch(Action::SetActiveTrack(next)); }
            self.bind(next);
            match next {
                Some(id) => {
                    self.seek(store, id, t);
                    if playing { self.request_play(store, id); }
                }
                None => {
                    if playing { store.dispatch(Action::SetIsPlaying(false)); }
                }
            }
            return;
        }

        let Some(id) = next else { return; };
        match reseek {
            Reseek::Always => self.seek(store, id, t),
            Reseek::IfDrifted => {
                let want = store.state().track(id).media_offset(t);
                if (self.media(id).current_time() - want).abs() > SEEK_EPSILON { self.seek(store, id, t); }
            }
            Reseek::Never => {}
        }
    }

    /// Swap the listened-to element. The outgoing one is detached and paused
    /// first so none of its late events can reach the store.
    fn bind(&mut self, id: Option<TrackId>) {
        if self.bound == id { return; }
        if let Some(old) = self.bound.take() {
            let el = self.element(old);
            el.detach();
            if !el.is_paused() { el.pause(); }
        }
        if let Some(new) = id { self.element(new).attach(); }
        self.bound = id;
    }

    fn seek<S: StoreHandle>(&mut self, store: &S, id: TrackId, t: Seconds) {
        let offset = store.state().track(id).media_offset(t);
        trace!(track = %id, offset, "seek");
        self.element(id).set_current_time(offset);
    }

    fn request_play<S: StoreHandle>(&mut self, store: &mut S, id: TrackId) {
        let el = self.element(id);
        if !el.is_paused() {
            trace!(track = %id, "element already playing");
            if !store.state().is_playing { store.dispatch(Action::SetIsPlaying(true)); }
            return;
        }
        if let Err(err) = el.play() {
            warn!(track = %id, %err, "play rejected; treating as paused");
            el.pause();
            if store.state().is_playing { store.dispatch(Action::SetIsPlaying(false)); }
        }
    }

    fn timeline_time<S: StoreHandle>(&self, store: &S, id: TrackId) -> Seconds {
        let state = store.state();
        let t = state.track(id).start + self.media(id).current_time();
        t.min(state.timeline_length())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{EditorState, PlaybackPhase, Store};
    use media::SimulatedMedia;
    use timeline::MediaSource;

    fn clip(name: &str, start: f64, duration: f64) -> Track {
        Track::loaded(MediaSource::new(name, name), duration).unwrap().with_start(start).unwrap()
    }

    fn setup(a: Track, b: Track) -> (Store, Synchronizer<SimulatedMedia>) {
        let mut store = Store::new(EditorState::new(800.0));
        let mut sync = Synchronizer::new(SimulatedMedia::new(), SimulatedMedia::new());
        for (id, track) in [(TrackId::A, a), (TrackId::B, b)] {
            sync.load_source(&mut store, id, &track);
            store.dispatch(Action::set_track(id, track));
        }
        (store, sync)
    }

    fn back_to_back() -> (Store, Synchronizer<SimulatedMedia>) {
        setup(clip("a", 0.0, 5.0), clip("b", 5.0, 5.0))
    }

    fn pump(store: &mut Store, sync: &mut Synchronizer<SimulatedMedia>) {
        for _ in 0..8 {
            if sync.poll(store) == 0 { break; }
        }
    }

    fn playing_count(sync: &Synchronizer<SimulatedMedia>) -> usize {
        TrackId::ALL.iter().filter(|id| sync.media(**id).is_playing()).count()
    }

    #[test]
    fn test_scrub_selects_by_half_open_window() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 5.0);
        assert_eq!(store.state().active_track, Some(TrackId::B));
        assert_eq!(sync.media(TrackId::B).current_time(), 0.0);
        sync.scrub(&mut store, 4.999);
        assert_eq!(store.state().active_track, Some(TrackId::A));
        assert!((sync.media(TrackId::A).current_time() - 4.999).abs() < 1e-9);
        assert_eq!(sync.bound(), Some(TrackId::A));
    }

    #[test]
    fn test_scrub_same_value_does_not_seek_twice() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 2.0);
        let seeks = sync.media(TrackId::A).seeks().len();
        sync.scrub(&mut store, 2.0);
        assert_eq!(sync.media(TrackId::A).seeks().len(), seeks);
        assert_eq!(sync.media(TrackId::B).seeks().len(), 0);
    }

    #[test]
    fn test_toggle_from_idle_picks_track_under_playhead() {
        let (mut store, mut sync) = back_to_back();
        store.dispatch(Action::SetPlayhead(6.5));
        sync.toggle(&mut store);
        assert_eq!(store.state().active_track, Some(TrackId::B));
        assert!((sync.media(TrackId::B).current_time() - 1.5).abs() < 1e-9);
        // Not confirmed until the element reports it.
        assert!(!store.state().is_playing);
        pump(&mut store, &mut sync);
        assert_eq!(store.state().phase(), PlaybackPhase::Playing(TrackId::B));
    }

    #[test]
    fn test_toggle_resumes_without_seeking() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 1.0);
        let seeks = sync.media(TrackId::A).seeks().len();
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        assert!(store.state().is_playing);
        assert_eq!(sync.media(TrackId::A).seeks().len(), seeks);
        sync.toggle(&mut store);
        assert!(!store.state().is_playing);
        assert_eq!(playing_count(&sync), 0);
    }

    #[test]
    fn test_timeupdate_moves_playhead_only_while_playing() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 1.0);
        sync.media_mut(TrackId::A).set_current_time(3.0);
        pump(&mut store, &mut sync);
        assert_eq!(store.state().playhead, 1.0);

        sync.media_mut(TrackId::A).set_current_time(1.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        sync.media_mut(TrackId::A).advance(0.5);
        pump(&mut store, &mut sync);
        assert!((store.state().playhead - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_playback_crosses_into_next_track() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 4.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        sync.media_mut(TrackId::A).advance(1.0);
        pump(&mut store, &mut sync);
        assert_eq!(store.state().phase(), PlaybackPhase::Playing(TrackId::B));
        assert_eq!(store.state().playhead, 5.0);
        assert!(sync.media(TrackId::B).is_playing());
        assert!(!sync.media(TrackId::A).is_playing());
    }

    #[test]
    fn test_ended_continues_into_other_track() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 4.9);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        // Element reached its end without a final timeupdate reaching us.
        sync.media_mut(TrackId::A).set_current_time(5.0);
        let _ = sync.media_mut(TrackId::A).drain_events();
        sync.handle_event(&mut store, TrackId::A, MediaEvent::Ended);
        assert_eq!(store.state().active_track, Some(TrackId::B));
        assert_eq!(store.state().playhead, 5.0);
        assert_eq!(sync.media(TrackId::B).current_time(), 0.0);
        pump(&mut store, &mut sync);
        assert!(store.state().is_playing);
        assert_eq!(playing_count(&sync), 1);
    }

    #[test]
    fn test_ended_without_next_track_clears_play_flag() {
        let (mut store, mut sync) = setup(clip("a", 0.0, 5.0), Track::empty());
        sync.scrub(&mut store, 4.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        sync.media_mut(TrackId::A).set_current_time(5.0);
        let _ = sync.media_mut(TrackId::A).drain_events();
        sync.handle_event(&mut store, TrackId::A, MediaEvent::Ended);
        assert_eq!(store.state().phase(), PlaybackPhase::Idle);
        assert!(!store.state().is_playing);
        assert_eq!(sync.bound(), None);
    }

    #[test]
    fn test_scrub_into_gap_stops_and_toggle_is_noop() {
        let (mut store, mut sync) = setup(clip("a", 0.0, 3.0), clip("b", 5.0, 3.0));
        sync.scrub(&mut store, 1.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        assert!(store.state().is_playing);

        sync.scrub(&mut store, 4.0);
        assert_eq!(store.state().phase(), PlaybackPhase::Idle);
        assert!(!store.state().is_playing);
        assert_eq!(playing_count(&sync), 0);

        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        assert_eq!(store.state().phase(), PlaybackPhase::Idle);
        assert_eq!(sync.media(TrackId::A).play_requests() + sync.media(TrackId::B).play_requests(), 1);

        sync.scrub(&mut store, 6.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        assert_eq!(store.state().phase(), PlaybackPhase::Playing(TrackId::B));
    }

    #[test]
    fn test_rejected_play_reconciles_to_paused() {
        let (mut store, mut sync) = back_to_back();
        sync.media_mut(TrackId::A).reject_play(Some("autoplay blocked"));
        sync.scrub(&mut store, 1.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        assert_eq!(store.state().phase(), PlaybackPhase::Paused(TrackId::A));
        assert_eq!(playing_count(&sync), 0);
    }

    #[test]
    fn test_rejected_play_on_switch_stops_playback() {
        let (mut store, mut sync) = back_to_back();
        sync.media_mut(TrackId::B).reject_play(Some("blocked"));
        sync.scrub(&mut store, 4.5);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        sync.media_mut(TrackId::A).advance(1.0);
        pump(&mut store, &mut sync);
        assert_eq!(store.state().phase(), PlaybackPhase::Paused(TrackId::B));
        assert_eq!(playing_count(&sync), 0);
    }

    #[test]
    fn test_native_controls_are_mirrored() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 1.0);
        // Native transport button on the preview element.
        sync.media_mut(TrackId::A).play().unwrap();
        pump(&mut store, &mut sync);
        assert!(store.state().is_playing);
        sync.media_mut(TrackId::A).pause();
        pump(&mut store, &mut sync);
        assert!(!store.state().is_playing);
    }

    #[test]
    fn test_play_on_running_element_is_not_reissued() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 1.0);
        // Started from the element's own controls; its play event is still queued.
        sync.media_mut(TrackId::A).play().unwrap();
        sync.toggle(&mut store);
        assert_eq!(sync.media(TrackId::A).play_requests(), 1);
        assert_eq!(store.state().phase(), PlaybackPhase::Playing(TrackId::A));
        pump(&mut store, &mut sync);
        assert_eq!(store.state().phase(), PlaybackPhase::Playing(TrackId::A));
        assert_eq!(playing_count(&sync), 1);
    }

    #[test]
    fn test_clock_only_moves_bound_element() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 1.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        sync.media_mut(TrackId::B).play().unwrap();
        sync.advance_clock(0.5);
        assert!((sync.media(TrackId::A).current_time() - 1.5).abs() < 1e-9);
        assert_eq!(sync.media(TrackId::B).current_time(), 0.0);
    }

    #[test]
    fn test_stale_events_from_previous_element_are_ignored() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 1.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        sync.scrub(&mut store, 6.0);
        pump(&mut store, &mut sync);
        // A was paused on the switch; its pause must not clear the flag.
        assert_eq!(store.state().phase(), PlaybackPhase::Playing(TrackId::B));
        sync.handle_event(&mut store, TrackId::A, MediaEvent::Pause);
        assert!(store.state().is_playing);
        assert_eq!(sync.media(TrackId::A).attach_count(), sync.media(TrackId::A).detach_count());
        assert!(sync.media(TrackId::B).is_attached());
    }

    #[test]
    fn test_only_one_element_ever_plays() {
        let (mut store, mut sync) = setup(clip("a", 0.0, 2.0), clip("b", 2.0, 2.0));
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        for step in 0..40 {
            if let Some(id) = sync.bound() { sync.media_mut(id).advance(0.25); }
            pump(&mut store, &mut sync);
            if step == 10 { sync.scrub(&mut store, 0.5); }
            assert!(playing_count(&sync) <= 1);
        }
        assert_eq!(store.state().phase(), PlaybackPhase::Idle);
        assert_eq!(store.state().playhead, 4.0);
    }

    #[test]
    fn test_reconcile_after_layout_change() {
        let (mut store, mut sync) = setup(clip("a", 0.0, 5.0), clip("b", 0.0, 5.0));
        sync.scrub(&mut store, 2.0);
        assert_eq!(store.state().active_track, Some(TrackId::B));
        let moved = store.state().track_b.with_start(5.0).unwrap();
        store.dispatch(Action::SetTrackB(moved));
        sync.reconcile(&mut store);
        assert_eq!(store.state().active_track, Some(TrackId::A));
        assert!((sync.media(TrackId::A).current_time() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_reload_of_active_track_stops_playback() {
        let (mut store, mut sync) = back_to_back();
        sync.scrub(&mut store, 1.0);
        sync.toggle(&mut store);
        pump(&mut store, &mut sync);
        let fresh = clip("a2", 0.0, 2.0);
        sync.load_source(&mut store, TrackId::A, &fresh);
        store.dispatch(Action::SetTrackA(fresh));
        sync.reconcile(&mut store);
        assert!(!store.state().is_playing);
        assert_eq!(store.state().phase(), PlaybackPhase::Paused(TrackId::A));
        assert_eq!(playing_count(&sync), 0);
    }
}
