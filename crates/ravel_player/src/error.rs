// SPDX-License-Identifier: MIT OR Apache-2.0
//! Player error type.

use ravel_graph::{ConnectionError, SerializationError};
use std::path::PathBuf;

/// Anything that stops the player
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// Reading or writing a file failed
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed or written
    #[error("Invalid config {}: {message}", path.display())]
    Config {
        /// Config file
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Config written by a newer player
    #[error("Config version {found} is newer than supported version {supported}")]
    ConfigVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// Scene text is not base64
    #[error("Scene text is not valid base64: {0}")]
    SceneText(#[from] base64::DecodeError),

    /// Scene bytes could not be decoded
    #[error("Scene error: {0}")]
    Scene(#[from] SerializationError),

    /// Demo graph could not be wired
    #[error("Wiring error: {0}")]
    Connection(#[from] ConnectionError),

    /// JSON output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// `log_filter` is not a valid filter directive
    #[error("Invalid log filter '{filter}': {message}")]
    LogFilter {
        /// Directive given
        filter: String,
        /// Parser message
        message: String,
    },
}

impl PlayerError {
    /// Wrap an IO error with the file it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
