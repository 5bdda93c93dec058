use std::path::PathBuf;
use thiserror::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for frame generation.
///
/// Each variant carries the context of its stage (dataset parsing, checkpoint
/// discovery, inference, rendering, encoding) so the binary can report the
/// offending file without string parsing.
#[derive(Error, Debug)]
pub enum FxVideoError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset error: {path:?} line {line}: {reason}")]
    Dataset {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Checkpoint error: {path:?}: {reason}")]
    Checkpoint { path: PathBuf, reason: String },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: BoxedError,
    },

    #[error("Render error: frame for epoch {epoch} could not be drawn")]
    Render {
        epoch: u64,
        #[source]
        source: BoxedError,
    },

    #[error("Encoding error: failed to write {path:?}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: BoxedError,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, FxVideoError>;

impl FxVideoError {
    pub(crate) fn model<E>(operation: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxedError>,
    {
        Self::Model {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub(crate) fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Fallback for I/O errors raised without path context. Callers that know the
/// path construct `FxVideoError::FileSystem` directly.
impl From<std::io::Error> for FxVideoError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

/// Convert ONNX Runtime errors to model errors.
impl From<ort::Error> for FxVideoError {
    fn from(err: ort::Error) -> Self {
        Self::model("ort operation", err)
    }
}

/// Shape errors come from building inference tensors, so they are reported as
/// model errors.
impl From<ndarray::ShapeError> for FxVideoError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::model("tensor shape conversion", err)
    }
}

impl From<csv::Error> for FxVideoError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map_or(0, |p| p.line());
        Self::Dataset {
            path: PathBuf::from("unknown"),
            line,
            reason: err.to_string(),
        }
    }
}
