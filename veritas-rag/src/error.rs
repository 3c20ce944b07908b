//! Error types for the `veritas-rag` crate.

use thiserror::Error;

/// Errors that can occur while chunking, embedding, indexing, or retrieving.
#[derive(Debug, Error)]
pub enum RagError {
    /// A caller supplied parameters that violate an operation's contract
    /// (for example `chunk_size == 0` or `k == 0`). No partial work is done.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The embedding provider failed. The core never retries.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector's dimensionality did not match the index.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the index was built with.
        expected: usize,
        /// Dimension that was supplied.
        actual: usize,
    },

    /// The persisted embedding cache could not be read or written.
    #[error("Cache error: {0}")]
    CacheError(String),

    /// A corpus record could not be decoded.
    #[error("Corpus error at line {line}: {message}")]
    CorpusError {
        /// 1-based line number in the source file.
        line: usize,
        /// A description of the failure.
        message: String,
    },

    /// A query arrived before any corpus was indexed.
    #[error("Index has not been built; call index_documents first")]
    IndexNotBuilt,

    /// An I/O error from the filesystem.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
