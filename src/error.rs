use std::path::PathBuf;
use thiserror::Error;

use crate::validation::ValidationReport;

/// The main error type for iiif-trainset operations.
#[derive(Debug, Error)]
pub enum TrainsetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to create output directory {path}: {source}")]
    DirectorySetup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Cache error for key '{key}': {source}")]
    Cache {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest {url}: {message}")]
    Manifest { url: String, message: String },

    #[error("Failed to parse annotation list {url}: {source}")]
    AnnotationList {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid annotation {id}: {message}")]
    Annotation { id: String, message: String },

    #[error("Face detection failed: {message}")]
    Detection { message: String },

    #[error("Failed to decode image from {url}: {source}")]
    ImageDecode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write image {path}: {source}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write JSON stream {path}: {source}")]
    JsonWrite {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Validation failed with {error_count} error(s) and {warning_count} warning(s)")]
    ValidationFailed {
        error_count: usize,
        warning_count: usize,
        report: ValidationReport,
    },
}

impl TrainsetError {
    /// Shorthand for an annotation error tied to an optional annotation `@id`.
    pub(crate) fn annotation(id: Option<&str>, message: impl Into<String>) -> Self {
        TrainsetError::Annotation {
            id: id.unwrap_or("<anonymous>").to_string(),
            message: message.into(),
        }
    }
}
