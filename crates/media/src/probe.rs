use std::fs::File;
use std::path::Path;

use symphonia::core::{
    codecs::CodecParameters,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};
use tracing::debug;

use crate::{MediaResource, ProbeError};

/// Learns a resource's intrinsic length. Called from loader worker threads.
pub trait DurationProbe: Send + Sync {
    fn probe(&self, resource: &MediaResource) -> Result<f64, ProbeError>;
}

/// Container probe backed by symphonia; synthetic resources report their
/// declared length.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaProbe;

impl DurationProbe for MediaProbe {
    fn probe(&self, resource: &MediaResource) -> Result<f64, ProbeError> {
        let duration = match resource {
            MediaResource::File(path) => probe_file(path)?,
            MediaResource::Synthetic { duration, .. } => *duration,
        };
        if !duration.is_finite() || duration < 0.0 {
            return Err(ProbeError::InvalidDuration(duration));
        }
        Ok(duration)
    }
}

fn probe_file(path: &Path) -> Result<f64, ProbeError> {
    let file = File::open(path).map_err(|source| ProbeError::Io { path: path.to_path_buf(), source })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ProbeError::Unsupported(e.to_string()))?;

    // Containers may carry several streams; the clip lasts as long as the longest.
    let longest = probed
        .format
        .tracks()
        .iter()
        .filter_map(|t| track_seconds(&t.codec_params))
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));
    debug!(path = %path.display(), duration = ?longest, "probed container");
    longest.ok_or(ProbeError::UnknownDuration)
}

fn track_seconds(params: &CodecParameters) -> Option<f64> {
    let frames = params.n_frames?;
    if let Some(tb) = params.time_base {
        let time = tb.calc_time(frames);
        return Some(time.seconds as f64 + time.frac);
    }
    let rate = params.sample_rate.filter(|r| *r > 0)?;
    Some(frames as f64 / rate as f64)
}
