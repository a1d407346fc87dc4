//! Error types for the textract block index.

use thiserror::Error;

/// Primary error type for index construction and queries.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The block collection handed to the build is missing or malformed.
    #[error("invalid document-analysis data: {0}")]
    InvalidInput(String),

    /// A query or lookup ran before a successful build.
    #[error("spatial index not initialized; call initialize() first")]
    NotInitialized,

    /// A query rectangle or point has a non-finite or negative field.
    #[error("invalid rectangle: {0}")]
    InvalidRect(String),

    /// The overlap ratio is outside [0, 1] or NaN.
    #[error("invalid overlap ratio {0}: must be a number between 0 and 1")]
    InvalidRatio(f64),

    /// The input is not valid JSON.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience Result type alias for IndexError.
pub type Result<T> = std::result::Result<T, IndexError>;
