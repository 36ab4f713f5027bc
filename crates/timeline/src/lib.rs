use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod geometry;

pub use geometry::TimelineGeometry;

#[derive(Debug, Error, PartialEq)]
pub enum TimelineError {
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),
    #[error("invalid start: {0}")]
    InvalidStart(f64),
}

pub type Seconds = f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackId {
    A,
    B,
}

impl TrackId {
    pub const ALL: [TrackId; 2] = [TrackId::A, TrackId::B];

    pub fn other(self) -> TrackId {
        match self { TrackId::A => TrackId::B, TrackId::B => TrackId::A }
    }

    pub fn index(self) -> usize {
        match self { TrackId::A => 0, TrackId::B => 1 }
    }

    pub fn label(self) -> &'static str {
        match self { TrackId::A => "A", TrackId::B => "B" }
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.label()) }
}

/// Opaque playable handle for a loaded clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
    pub id: Uuid,
    pub name: String,
    pub uri: String,
}

impl MediaSource {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self { id: Uuid::new_v4(), name: name.into(), uri: uri.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub source: Option<MediaSource>,
    pub start: Seconds,
    pub duration: Seconds,
}

impl Default for Track {
    fn default() -> Self { Self::empty() }
}

impl Track {
    pub const fn empty() -> Self { Self { source: None, start: 0.0, duration: 0.0 } }

    /// A freshly loaded track placed at the origin.
    pub fn loaded(source: MediaSource, duration: Seconds) -> Result<Self, TimelineError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(TimelineError::InvalidDuration(duration));
        }
        Ok(Self { source: Some(source), start: 0.0, duration })
    }

    pub fn with_start(&self, start: Seconds) -> Result<Self, TimelineError> {
        if !start.is_finite() || start < 0.0 {
            return Err(TimelineError::InvalidStart(start));
        }
        Ok(Self { source: self.source.clone(), start, duration: self.duration })
    }

    pub fn is_loaded(&self) -> bool { self.source.is_some() }

    pub fn end(&self) -> Seconds { self.start + self.duration }

    /// Half-open window `[start, start + duration)`; unloaded tracks contain nothing.
    pub fn contains(&self, t: Seconds) -> bool {
        self.is_loaded() && t >= self.start && t < self.end()
    }

    /// Offset into the clip's own media time for a timeline position, never negative.
    pub fn media_offset(&self, t: Seconds) -> Seconds { (t - self.start).max(0.0) }

    pub fn display_name(&self) -> &str {
        self.source.as_ref().map(|s| s.name.as_str()).unwrap_or("Video File")
    }
}

pub fn timeline_length(a: &Track, b: &Track) -> Seconds {
    match (a.is_loaded(), b.is_loaded()) {
        (false, false) => 0.0,
        (true, false) => a.duration,
        (false, true) => b.duration,
        (true, true) => a.duration + b.duration,
    }
}

/// Which track owns the preview at `t`. B wins any overlap.
pub fn active_track_at(a: &Track, b: &Track, t: Seconds) -> Option<TrackId> {
    if b.contains(t) {
        Some(TrackId::B)
    } else if a.contains(t) {
        Some(TrackId::A)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(start: f64, duration: f64) -> Track {
        Track::loaded(MediaSource::new("clip.mp4", "file:///clip.mp4"), duration).unwrap().with_start(start).unwrap()
    }

    #[test]
    fn test_timeline_length_by_loaded_tracks() {
        let empty = Track::empty();
        assert_eq!(timeline_length(&empty, &empty), 0.0);
        assert_eq!(timeline_length(&clip(0.0, 5.0), &empty), 5.0);
        assert_eq!(timeline_length(&empty, &clip(0.0, 3.0)), 3.0);
        assert_eq!(timeline_length(&clip(0.0, 5.0), &clip(0.0, 3.0)), 8.0);
    }

    #[test]
    fn test_window_is_half_open() {
        let a = clip(0.0, 5.0);
        assert!(a.contains(0.0));
        assert!(a.contains(4.999));
        assert!(!a.contains(5.0));
        assert!(!a.contains(-0.001));
    }

    #[test]
    fn test_unloaded_track_contains_nothing() {
        let mut t = Track::empty();
        t.duration = 10.0;
        assert!(!t.contains(1.0));
    }

    #[test]
    fn test_active_track_boundaries() {
        let a = clip(0.0, 5.0);
        let b = clip(5.0, 5.0);
        assert_eq!(active_track_at(&a, &b, 4.999), Some(TrackId::A));
        assert_eq!(active_track_at(&a, &b, 5.0), Some(TrackId::B));
        assert_eq!(active_track_at(&a, &b, 10.0), None);
    }

    #[test]
    fn test_b_takes_priority_on_overlap() {
        let a = clip(0.0, 5.0);
        let b = clip(0.0, 5.0);
        for i in 0..50 {
            let t = i as f64 * 0.1;
            assert_eq!(active_track_at(&a, &b, t), Some(TrackId::B));
        }
    }

    #[test]
    fn test_active_track_never_excludes_playhead() {
        let a = clip(0.0, 4.0);
        let b = clip(6.0, 4.0);
        let len = timeline_length(&a, &b);
        let mut t = 0.0;
        while t < len {
            match active_track_at(&a, &b, t) {
                Some(TrackId::A) => assert!(a.contains(t) && !b.contains(t)),
                Some(TrackId::B) => assert!(b.contains(t)),
                None => assert!(!a.contains(t) && !b.contains(t)),
            }
            t += 0.05;
        }
    }

    #[test]
    fn test_loaded_rejects_bad_duration() {
        let src = MediaSource::new("x", "x");
        assert_eq!(Track::loaded(src.clone(), f64::NAN).unwrap_err().to_string(), "invalid duration: NaN");
        assert!(Track::loaded(src.clone(), -1.0).is_err());
        assert!(Track::loaded(src, f64::INFINITY).is_err());
    }

    #[test]
    fn test_media_offset_clamps_negative_drift() {
        let b = clip(5.0, 5.0);
        assert_eq!(b.media_offset(4.9999999), 0.0);
        assert!((b.media_offset(7.5) - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_track_serializes_source_handle() {
        let t = clip(1.5, 2.0);
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["start"], 1.5);
        assert_eq!(json["source"]["name"], "clip.mp4");
        assert_eq!(Track::empty().display_name(), "Video File");
    }
}
