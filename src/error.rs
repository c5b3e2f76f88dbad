//! Error types for the RSD library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for RSD operations.
pub type Result<T> = std::result::Result<T, RsdError>;

/// Errors that abort an ortholog computation.
///
/// Conditions the algorithm recovers from on its own (a distance that could not
/// be estimated, a non-reciprocal hit) are not errors; see [`crate::Distance`].
#[derive(Error, Debug)]
pub enum RsdError {
    /// Input file not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error during file operations
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// External program could not be located
    #[error("{0} binary not found. Install it or put it on PATH (or in RSD_BIN_DIR)")]
    BinaryNotFound(String),

    /// External program exited unsuccessfully
    #[error("{program} failed: {message}")]
    ProcessFailed { program: String, message: String },

    /// External program exceeded its time budget and was killed
    #[error("{program} timed out after {seconds:.1}s")]
    Timeout { program: String, seconds: f64 },

    /// Aligner produced no output, even after the retry
    #[error("Alignment failed after retry: {0}")]
    AlignmentFailed(String),

    /// Collaborator output could not be interpreted
    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    /// Sequence id not present in the genome
    #[error("Sequence {id} not found in genome {genome}")]
    UnknownSequence { genome: String, id: String },

    /// Invalid configuration parameter
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to parse serialized orthologs
    #[error("Failed to parse ortholog data: {0}")]
    OrthDataParse(String),

    /// Saved hits could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Worker pool could not be started
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// UTF-8 conversion error
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    /// Temporary directory creation failed
    #[error("Failed to create temporary directory")]
    TempDirError,

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

impl From<tempfile::PersistError> for RsdError {
    fn from(e: tempfile::PersistError) -> Self {
        RsdError::IoError(e.error)
    }
}
