use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use timeline::geometry::MIN_LABEL_WIDTH_PX;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("parse config {path:?}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

/// Where a freshly loaded track is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPlacement {
    /// Start at 0, possibly overlapping the other track until dragged.
    #[default]
    Origin,
    /// Start where the other loaded track ends, or in front of it when it was
    /// moved far enough right. Always inside the new timeline.
    AfterOther,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub initial_viewport_width: f32,
    pub min_label_width_px: f32,
    pub scrub_step: f64,
    pub placement: LoadPlacement,
    pub probe_workers: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_viewport_width: 800.0,
            min_label_width_px: MIN_LABEL_WIDTH_PX,
            scrub_step: 0.01,
            placement: LoadPlacement::Origin,
            probe_workers: 2,
        }
    }
}

impl EditorConfig {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> { serde_json::from_str(s) }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }
}
