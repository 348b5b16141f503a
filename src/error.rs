//! Error types shared by the ingestion and query pipelines.

use thiserror::Error;

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Failures surfaced by extraction, embedding, storage, and generation.
#[derive(Error, Debug)]
pub enum RagError {
    /// The PDF could not be parsed or its text could not be extracted.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    /// The embedding backend failed to load or to run.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// The embedded vector database rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// Filesystem access around the store or the default book failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A hosted language-model call failed.
    #[error("provider error: {0}")]
    Provider(String),

    /// Startup configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// A vector did not match the dimension of its counterpart.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the operation required.
        expected: usize,
        /// Dimension that was supplied.
        actual: usize,
    },

    /// A shared resource was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    Lock(&'static str),

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),

    /// Caller-supplied data was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
