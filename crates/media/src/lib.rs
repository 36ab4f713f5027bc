//! Host media playback interfaces.
//!
//! The editor core never decodes frames itself. It drives one host media
//! element per track slot through [`MediaElement`] and learns clip lengths
//! through a [`DurationProbe`]. [`SimulatedMedia`] is a clock-driven element
//! for hosts (and tests) without a native player.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use timeline::MediaSource;

mod probe;
mod simulated;

pub use probe::{DurationProbe, MediaProbe};
pub use simulated::SimulatedMedia;

#[derive(Debug, Error, PartialEq)]
pub enum MediaError {
    #[error("no source loaded")]
    NoSource,
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("open {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("unsupported media: {0}")]
    Unsupported(String),
    #[error("media has no known duration")]
    UnknownDuration,
    #[error("invalid duration: {0}")]
    InvalidDuration(f64),
}

/// Events a media element reports back to whoever is listening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaEvent {
    TimeUpdate,
    Play,
    Pause,
    Ended,
}

/// One host playback element (one per track slot).
pub trait MediaElement {
    /// Point the element at a new source. `duration` is the probed length;
    /// hosts that know the intrinsic length may ignore it.
    fn load(&mut self, source: &MediaSource, duration: f64);

    fn unload(&mut self);

    /// Request playback. Success means the request was accepted, not that
    /// playback started; a `Play` event confirms it.
    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    fn is_paused(&self) -> bool;

    /// Start delivering events to the synchronizer.
    fn attach(&mut self);

    /// Stop delivering events. Pending undelivered events are dropped.
    fn detach(&mut self);

    /// Take the events queued since the last call.
    fn drain_events(&mut self) -> Vec<MediaEvent>;
}

/// Playback clock of an element whose time does not move on its own.
/// Advancing a clock is not a transport command.
pub trait MediaClock {
    fn advance(&mut self, dt: f64);
}

/// A file-like resource produced by file selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaResource {
    File(PathBuf),
    /// Duration-only stand-in, used where no real file is available.
    Synthetic { name: String, duration: f64 },
}

impl MediaResource {
    pub fn file(path: impl Into<PathBuf>) -> Self { MediaResource::File(path.into()) }

    pub fn synthetic(name: impl Into<String>, duration: f64) -> Self {
        MediaResource::Synthetic { name: name.into(), duration }
    }

    /// Parses `synthetic:<name>:<seconds>`; anything else is a file path.
    pub fn parse(s: &str) -> Result<Self, ProbeError> {
        let Some(rest) = s.strip_prefix("synthetic:") else { return Ok(Self::file(s)); };
        let (name, secs) = rest.rsplit_once(':').ok_or_else(|| ProbeError::Unsupported(s.to_string()))?;
        let duration = secs.parse::<f64>().map_err(|_| ProbeError::Unsupported(s.to_string()))?;
        Ok(Self::synthetic(name, duration))
    }

    pub fn name(&self) -> String {
        match self {
            MediaResource::File(path) => path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            MediaResource::Synthetic { name, .. } => name.clone(),
        }
    }

    /// Playable handle for this resource; a fresh id per call.
    pub fn to_source(&self) -> MediaSource {
        let uri = match self {
            MediaResource::File(path) => file_uri(path),
            MediaResource::Synthetic { name, .. } => format!("synthetic:{}", name),
        };
        MediaSource::new(self.name(), uri)
    }
}

fn file_uri(path: &Path) -> String {
    let abs = if path.is_absolute() { path.to_path_buf() } else { std::env::current_dir().map(|d| d.join(path)).unwrap_or_else(|_| path.to_path_buf()) };
    format!("file://{}", abs.display())
}
