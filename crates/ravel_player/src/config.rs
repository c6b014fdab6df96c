// SPDX-License-Identifier: MIT OR Apache-2.0
//! Player configuration, stored as RON.

use crate::error::PlayerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "ravel.ron";

/// Default log directive
pub const DEFAULT_LOG_FILTER: &str = "ravel_graph=info,ravel_player=info";

/// Headless player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Config format version
    pub version: u32,
    /// Frames to run
    pub frames: u64,
    /// Fixed frame delta in milliseconds
    pub frame_dt_ms: u64,
    /// `tracing` filter directive, overridden by `RUST_LOG`
    pub log_filter: String,
    /// Root for relative mesh paths
    pub assets_dir: Option<PathBuf>,
    /// Print node views every N frames; 0 prints only after the last frame
    pub print_every: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            frames: 60,
            frame_dt_ms: 16,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            assets_dir: None,
            print_every: 0,
        }
    }
}

impl PlayerConfig {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, PlayerError> {
        let content = std::fs::read_to_string(path).map_err(|e| PlayerError::io(path, e))?;
        let config: PlayerConfig = ron::from_str(&content).map_err(|e| PlayerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(PlayerError::ConfigVersion {
                found: config.version,
                supported: CONFIG_FORMAT_VERSION,
            });
        }

        Ok(config)
    }

    /// Load `path` if given, else `ravel.ron` from the working directory if
    /// present, else the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, PlayerError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Save the config
    pub fn save(&self, path: &Path) -> Result<(), PlayerError> {
        let pretty = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, pretty).map_err(|e| PlayerError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, content).map_err(|e| PlayerError::io(path, e))
    }

    /// Fixed frame delta
    pub fn frame_dt(&self) -> Duration {
        Duration::from_millis(self.frame_dt_ms)
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, frames: Option<u64>, dt_ms: Option<u64>) -> Self {
        if let Some(frames) = frames {
            self.frames = frames;
        }
        if let Some(dt_ms) = dt_ms {
            self.frame_dt_ms = dt_ms;
        }
        self
    }
}
