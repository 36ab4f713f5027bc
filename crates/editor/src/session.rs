use std::sync::Arc;
use std::time::Duration;

use loader::{Generation, LoaderError, ProbeEvent, ProbeStatus, TrackLoader};
use media::{DurationProbe, MediaClock, MediaElement, MediaEvent, MediaResource};
use serde::Serialize;
use timeline::{Seconds, Track, TrackId};
use tracing::{debug, info, warn};

use crate::config::{EditorConfig, LoadPlacement};
use crate::drag::DragReconciler;
use crate::state::{Action, EditorState, Store, StoreHandle};
use crate::sync::Synchronizer;
use crate::view::TimelineView;

/// Upper bound on event rounds per poll; switching elements can queue more.
const MAX_POLL_ROUNDS: usize = 8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LoadStatus {
    Empty,
    Probing(Generation),
    Loaded,
    Rejected(String),
}

/// One editing session: the store plus everything allowed to change it.
pub struct Editor<M: MediaElement> {
    store: Store,
    sync: Synchronizer<M>,
    drag: DragReconciler,
    loader: TrackLoader,
    config: EditorConfig,
    status: [LoadStatus; 2],
}

impl<M: MediaElement> Editor<M> {
    pub fn new(config: EditorConfig, media_a: M, media_b: M, probe: Arc<dyn DurationProbe>) -> Self {
        let loader = TrackLoader::start(probe, config.probe_workers);
        Self {
            store: Store::new(EditorState::new(config.initial_viewport_width)),
            sync: Synchronizer::new(media_a, media_b),
            drag: DragReconciler::new(),
            loader,
            config,
            status: [LoadStatus::Empty, LoadStatus::Empty],
        }
    }

    pub fn state(&self) -> &EditorState { self.store.state() }

    pub fn config(&self) -> &EditorConfig { &self.config }

    pub fn view(&self) -> TimelineView { TimelineView::build(self.store.state(), &self.drag, &self.config) }

    pub fn media(&self, id: TrackId) -> &M { self.sync.media(id) }

    /// Step the active element's clock and deliver what it reports.
    pub fn advance_clock(&mut self, dt: Seconds) -> usize
    where
        M: MediaClock,
    {
        self.sync.advance_clock(dt);
        self.poll_media()
    }

    pub fn load_status(&self, id: TrackId) -> &LoadStatus { &self.status[id.index()] }

    /// Start loading `resource` into slot `id`. The track appears once the
    /// probe completes and [`Editor::poll_loads`] picks it up.
    pub fn load(&mut self, id: TrackId, resource: MediaResource) -> Result<Generation, LoaderError> {
        let generation = self.loader.request(id, resource)?;
        self.status[id.index()] = LoadStatus::Probing(generation);
        Ok(generation)
    }

    /// Apply finished probes. Returns how many tracks were committed.
    pub fn poll_loads(&mut self) -> usize {
        let mut committed = 0;
        while let Some(ev) = self.loader.try_next() {
            if self.apply_probe(ev) { committed += 1; }
        }
        committed
    }

    /// Block until outstanding probes finish (or `timeout`), applying them.
    pub fn wait_for_loads(&mut self, timeout: Duration) -> Result<usize, LoaderError> {
        let events = self.loader.wait_all(timeout)?;
        Ok(events.into_iter().map(|ev| self.apply_probe(ev)).filter(|committed| *committed).count())
    }

    fn apply_probe(&mut self, ev: ProbeEvent) -> bool {
        let ProbeEvent { id: request, slot, generation, status } = ev;
        if !self.loader.is_current(slot, generation) {
            warn!(%slot, generation, %request, "discarding stale probe completion");
            return false;
        }
        match status {
            ProbeStatus::Ready(track) => {
                let track = self.place(slot, track);
                info!(%slot, name = track.display_name(), duration = track.duration, start = track.start, "track loaded");
                self.sync.load_source(&mut self.store, slot, &track);
                self.store.dispatch(Action::set_track(slot, track));
                self.status[slot.index()] = LoadStatus::Loaded;
                self.sync.reconcile(&mut self.store);
                true
            }
            ProbeStatus::Failed(reason) => {
                warn!(%slot, %reason, "load rejected; keeping previous track");
                self.status[slot.index()] = LoadStatus::Rejected(reason);
                false
            }
            ProbeStatus::Superseded => false,
        }
    }

    fn place(&self, slot: TrackId, track: Track) -> Track {
        match self.config.placement {
            LoadPlacement::Origin => track,
            LoadPlacement::AfterOther => {
                let other = self.store.state().track(slot.other());
                if !other.is_loaded() { return track; }
                // The timeline becomes both durations long. Fill the room in
                // front of the other track if there is enough, else end at the
                // timeline end (right after it when it starts at 0).
                let start = if other.start >= track.duration { 0.0 } else { other.duration };
                track.with_start(start).unwrap_or(track)
            }
        }
    }

    /// Move the playhead from the scrubber; clamped to the timeline.
    pub fn scrub(&mut self, t: Seconds) {
        let len = self.store.state().timeline_length();
        let t = if t.is_finite() { t.clamp(0.0, len) } else { 0.0 };
        self.sync.scrub(&mut self.store, t);
    }

    pub fn toggle_play(&mut self) { self.sync.toggle(&mut self.store); }

    pub fn drag_begin(&mut self, id: TrackId) -> bool { self.drag.begin(self.store.state(), id) }

    pub fn drag_move(&mut self, delta_px: f32) { self.drag.update(delta_px); }

    pub fn drag_end(&mut self, delta_px: f32) -> Option<Track> {
        let moved = self.drag.end(&mut self.store, delta_px)?;
        self.sync.reconcile(&mut self.store);
        Some(moved)
    }

    pub fn drag_cancel(&mut self) { self.drag.cancel(); }

    pub fn resize(&mut self, width_px: f32) {
        if width_px.is_finite() && width_px >= 0.0 && width_px != self.store.state().timeline_pixel_width {
            debug!(width_px, "timeline resized");
            self.store.dispatch(Action::SetTimelinePixelWidth(width_px));
        }
    }

    pub fn set_hovering(&mut self, hovering: bool) {
        if hovering != self.store.state().is_hovering { self.store.dispatch(Action::SetIsHovering(hovering)); }
    }

    /// Deliver one event from a host that pushes media events.
    pub fn on_media_event(&mut self, id: TrackId, event: MediaEvent) {
        self.sync.handle_event(&mut self.store, id, event);
    }

    /// Drain queued events from both elements until quiet.
    pub fn poll_media(&mut self) -> usize {
        let mut total = 0;
        for _ in 0..MAX_POLL_ROUNDS {
            let n = self.sync.poll(&mut self.store);
            if n == 0 { break; }
            total += n;
        }
        total
    }
}
