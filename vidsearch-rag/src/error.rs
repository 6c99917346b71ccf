//! Error types for the `vidsearch-rag` crate.

use thiserror::Error;

/// Errors that can occur while indexing or retrieving transcripts.
#[derive(Debug, Error)]
pub enum RagError {
    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingError {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector index backend.
    #[error("Vector index error ({backend}): {message}")]
    VectorIndexError {
        /// The vector index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A transcript or chapter could not be written to the index.
    #[error("Indexing error for transcript '{transcript_id}': {message}")]
    IndexingError {
        /// The transcript being indexed.
        transcript_id: String,
        /// A description of the failure.
        message: String,
    },

    /// A search query could not be completed.
    #[error("Retrieval error: {0}")]
    RetrievalError(String),

    /// A stored payload could not be (de)serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A convenience result type for indexing and retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;
