//! Error types for the `vidsearch-service` crate.

use thiserror::Error;
use vidsearch_rag::RagError;

/// Errors that can occur while ingesting media or serving searches.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The transcription engine could not be reached or answered badly.
    #[error("Transcription error ({engine}): {message}")]
    TranscriptionError {
        /// The engine that produced the error.
        engine: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the relational store backend.
    #[error("Store error ({backend}): {message}")]
    StoreError {
        /// The store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The work queue is closed.
    #[error("Queue error: {0}")]
    QueueError(String),

    /// A work-item source could not be read or parsed.
    #[error("Source error: {0}")]
    SourceError(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An indexing or retrieval error.
    #[error(transparent)]
    Rag(#[from] RagError),

    /// A payload could not be (de)serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// An I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Whether redelivering the work item might succeed.
    ///
    /// External call failures are transient; malformed input and
    /// configuration problems are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TranscriptionError { .. } | Self::StoreError { .. } => true,
            Self::Rag(err) => !matches!(err, RagError::ConfigError(_) | RagError::Json(_)),
            Self::QueueError(_)
            | Self::SourceError(_)
            | Self::ConfigError(_)
            | Self::Json(_)
            | Self::Io(_) => false,
        }
    }
}

/// A convenience result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
