// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the annotation library.

use std::fmt;
use std::path::{Path, PathBuf};

/// Result type alias for annotation operations.
pub type Result<T> = std::result::Result<T, AnnotatorError>;

/// Main error type for the annotation library.
#[derive(Debug)]
pub enum AnnotatorError {
    /// Wrapped `std::io::Error` without path context.
    Io(std::io::Error),
    /// A filesystem operation failed on a specific path.
    FileError {
        /// The path that could not be read or written.
        path: PathBuf,
        /// Underlying reason.
        reason: String,
    },
    /// Malformed table, JSON or YAML content.
    ParseError(String),
    /// Invalid or inconsistent configuration file.
    ConfigError(String),
    /// A user edit was rejected before any mutation took place.
    ValidationError(String),
    /// Error decoding or encoding images.
    ImageError(String),
    /// Error while exporting annotated images.
    ExportError(String),
    /// An operation needed a current image but none is open.
    NoImageLoaded,
}

impl AnnotatorError {
    /// Build a [`AnnotatorError::FileError`] for `path` from any displayable reason.
    pub fn file(path: impl AsRef<Path>, reason: impl fmt::Display) -> Self {
        Self::FileError {
            path: path.as_ref().to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for AnnotatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::FileError { path, reason } => {
                write!(f, "File error: {}: {reason}", path.display())
            }
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ExportError(msg) => write!(f, "Export error: {msg}"),
            Self::NoImageLoaded => write!(f, "No image loaded"),
        }
    }
}

impl std::error::Error for AnnotatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for AnnotatorError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for AnnotatorError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<csv::Error> for AnnotatorError {
    fn from(err: csv::Error) -> Self {
        Self::ParseError(format!("CSV: {err}"))
    }
}

impl From<serde_json::Error> for AnnotatorError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(format!("JSON: {err}"))
    }
}

impl From<serde_yaml::Error> for AnnotatorError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigError(format!("YAML: {err}"))
    }
}
