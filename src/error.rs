//! Error types for annotation runs.

use std::path::PathBuf;
use thiserror::Error;

use crate::canvas::CanvasError;
use crate::config::ConfigError;
use crate::data::LoaderError;

/// Errors that can occur while configuring or running an annotation batch.
///
/// Conditions that are part of normal use (removing from an empty point
/// stack, advancing past the last item, pressing an unbound key) are not
/// errors and never show up here.
#[derive(Error, Debug)]
pub enum AnnotateError {
    /// The sink file already exists and appending was not requested.
    #[error("Sink {path:?} already exists. Choose another file, delete it, or enable append")]
    Configuration {
        /// The sink that would have been overwritten
        path: PathBuf,
    },

    /// A completed annotation could not be appended to the sink.
    ///
    /// The result is still held in memory on the owning data unit.
    #[error("Failed to persist annotation to {path:?}: {source}")]
    Persistence {
        /// The sink being written
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The post-transform output could not be rendered to text.
    #[error("Failed to render annotation result: {0}")]
    Render(#[from] serde_json::Error),

    /// The canvas collaborator failed.
    #[error("Canvas error: {0}")]
    Canvas(#[from] CanvasError),

    /// An item could not be loaded from disk.
    #[error("Failed to load {path:?}: {source}")]
    Load {
        /// File that failed to load
        path: PathBuf,
        /// Loader failure
        #[source]
        source: LoaderError,
    },

    /// Invalid configuration file.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Any other I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnnotateError {
    /// Create a configuration error for a sink that already exists.
    pub fn configuration(path: impl Into<PathBuf>) -> Self {
        Self::Configuration { path: path.into() }
    }

    /// Create a persistence error for a failed sink write.
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.into(),
            source,
        }
    }

    /// Create a load error for an item file.
    pub fn load(path: impl Into<PathBuf>, source: LoaderError) -> Self {
        Self::Load {
            path: path.into(),
            source,
        }
    }

    /// Whether this error was raised before any session could start.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Config(_))
    }
}
