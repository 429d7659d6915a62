//! Error taxonomy for the occupancy pipeline
//!
//! Skippable conditions (weekend days, thin days, null labels, the
//! "no person" entity) are not errors and never reach this type.

use std::path::PathBuf;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Input cannot be trusted; aborts processing of the file
    #[error("data integrity error: {message}")]
    DataIntegrity { message: String },

    /// A required CSV column is absent
    #[error("missing required column '{column}' in {source_name}")]
    MissingColumn { column: String, source_name: String },

    /// A room label has no display category
    #[error("room '{room}' has no entry in the room category map")]
    UnmappedRoom { room: String },

    /// Any other configuration inconsistency
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::DataIntegrity { message: message.into() }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Whether this error stems from a bad room map or settings
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnmappedRoom { .. } | Self::Configuration { .. })
    }
}
