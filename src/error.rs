//! Error types for uvwrap.
//!
//! Degenerate triangles are never errors: the metric functions skip them.
//! Everything that can actually fail funnels into [`UvError`].

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`UvError`].
pub type Result<T> = std::result::Result<T, UvError>;

/// Errors that can occur while loading, unwrapping, scoring, or batching meshes.
#[derive(Error, Debug)]
pub enum UvError {
    /// A triangle references a vertex index outside the vertex array.
    #[error("triangle {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The triangle index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// The UV array does not have one entry per vertex.
    #[error("UV count mismatch: expected {expected} coordinates, found {found}")]
    UvCountMismatch {
        /// Number of vertices in the mesh.
        expected: usize,
        /// Number of UV coordinates supplied.
        found: usize,
    },

    /// An operation needed UV coordinates but the mesh has none.
    #[error("mesh has no UV coordinates")]
    MissingUvs,

    /// The unwrap engine reported a failure.
    #[error("unwrap engine failed with code {code}: {message}")]
    EngineFailure {
        /// Engine-specific status code.
        code: i32,
        /// Human-readable reason.
        message: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// The requested optimization target is not a known metric.
    #[error("unknown metric: {0} (expected stretch, coverage, or angle_distortion)")]
    UnknownMetric(String),

    /// A batch was started without any input files.
    #[error("no input files given")]
    NoInputs,

    /// The batch output destination could not be created.
    #[error("cannot use output destination {path}: {source}")]
    OutputDestination {
        /// The output directory.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// Report or parameter (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl UvError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        UvError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create an engine failure error.
    pub fn engine(code: i32, message: impl Into<String>) -> Self {
        UvError::EngineFailure {
            code,
            message: message.into(),
        }
    }
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
