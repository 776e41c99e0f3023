//! Error types for the RAG crate.

use thiserror::Error;

/// Errors that can occur while building or querying the retrieval pipeline.
#[derive(Debug, Error)]
pub enum RagError {
    /// Embedding operation failed.
    #[error("embedding failed: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Dimension mismatch between an embedding and the index.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension provided.
        actual: usize,
    },

    /// The embedder returned a different number of rows than there are passages.
    #[error("corpus has {passages} passages but {rows} embeddings were produced")]
    CorpusMismatch {
        /// Number of passages in the corpus.
        passages: usize,
        /// Number of embedding rows returned.
        rows: usize,
    },
}

/// Result type alias for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors returned by [`AnswerGenerator::generate`](crate::AnswerGenerator::generate).
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The completion service failed (transport, timeout, non-success status).
    #[error("{0}")]
    Upstream(#[source] Box<dyn std::error::Error + Send + Sync>),
}
