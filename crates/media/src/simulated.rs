use timeline::MediaSource;

use crate::{MediaClock, MediaElement, MediaError, MediaEvent};

/// Clock-driven media element. Time only moves when the host calls
/// [`SimulatedMedia::advance`], which makes playback deterministic.
#[derive(Debug, Default)]
pub struct SimulatedMedia {
    source: Option<MediaSource>,
    duration: f64,
    time: f64,
    playing: bool,
    attached: bool,
    events: Vec<MediaEvent>,
    reject_play: Option<String>,
    seeks: Vec<f64>,
    play_requests: usize,
    attach_count: usize,
    detach_count: usize,
}

impl SimulatedMedia {
    pub fn new() -> Self { Self::default() }

    /// Make every following `play()` fail, like a blocked autoplay policy.
    pub fn reject_play(&mut self, reason: Option<&str>) { self.reject_play = reason.map(str::to_string); }

    /// Move the clock forward by `dt` seconds while playing, reporting a
    /// timeupdate and, at the end of the clip, pause + ended.
    pub fn advance(&mut self, dt: f64) {
        if !self.playing || !dt.is_finite() || dt <= 0.0 { return; }
        self.time = (self.time + dt).min(self.duration);
        self.emit(MediaEvent::TimeUpdate);
        if self.time >= self.duration {
            self.playing = false;
            self.emit(MediaEvent::Pause);
            self.emit(MediaEvent::Ended);
        }
    }

    pub fn source(&self) -> Option<&MediaSource> { self.source.as_ref() }
    pub fn duration(&self) -> f64 { self.duration }
    pub fn is_playing(&self) -> bool { self.playing }
    pub fn is_attached(&self) -> bool { self.attached }

    /// Every seek issued so far, after clamping.
    pub fn seeks(&self) -> &[f64] { &self.seeks }
    pub fn play_requests(&self) -> usize { self.play_requests }
    pub fn attach_count(&self) -> usize { self.attach_count }
    pub fn detach_count(&self) -> usize { self.detach_count }

    fn emit(&mut self, event: MediaEvent) {
        if self.attached { self.events.push(event); }
    }
}

impl MediaClock for SimulatedMedia {
    fn advance(&mut self, dt: f64) { SimulatedMedia::advance(self, dt) }
}

impl MediaElement for SimulatedMedia {
    fn load(&mut self, source: &MediaSource, duration: f64) {
        self.pause();
        self.source = Some(source.clone());
        self.duration = duration.max(0.0);
        self.time = 0.0;
    }

    fn unload(&mut self) {
        self.pause();
        self.source = None;
        self.duration = 0.0;
        self.time = 0.0;
    }

    fn play(&mut self) -> Result<(), MediaError> {
        self.play_requests += 1;
        if self.source.is_none() { return Err(MediaError::NoSource); }
        if let Some(reason) = &self.reject_play {
            return Err(MediaError::PlaybackRejected(reason.clone()));
        }
        if self.playing { return Ok(()); }
        // Playing an ended element restarts it.
        if self.time >= self.duration {
            self.time = 0.0;
            self.emit(MediaEvent::TimeUpdate);
        }
        self.playing = true;
        self.emit(MediaEvent::Play);
        Ok(())
    }

    fn pause(&mut self) {
        if !self.playing { return; }
        self.playing = false;
        self.emit(MediaEvent::Pause);
    }

    fn current_time(&self) -> f64 { self.time }

    fn set_current_time(&mut self, seconds: f64) {
        let t = if seconds.is_finite() { seconds.clamp(0.0, self.duration) } else { 0.0 };
        self.time = t;
        self.seeks.push(t);
        self.emit(MediaEvent::TimeUpdate);
    }

    fn is_paused(&self) -> bool { !self.playing }

    fn attach(&mut self) {
        if self.attached { return; }
        self.attached = true;
        self.attach_count += 1;
    }

    fn detach(&mut self) {
        if !self.attached { return; }
        self.attached = false;
        self.detach_count += 1;
        self.events.clear();
    }

    fn drain_events(&mut self) -> Vec<MediaEvent> { std::mem::take(&mut self.events) }
}
