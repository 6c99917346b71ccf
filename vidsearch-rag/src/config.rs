//! Configuration for indexing and retrieval.

use serde::{Deserialize, Serialize};

use crate::chunking::{DEFAULT_CHAPTER_MAX_TOKENS, DEFAULT_TRANSCRIPT_MAX_TOKENS};
use crate::error::{RagError, Result};

/// Default number of nearest neighbours requested per collection query.
pub const DEFAULT_TOP_N: usize = 10;

/// Default number of scored chapters kept per transcript result.
pub const DEFAULT_MAX_RELEVANT_CHAPTERS: usize = 3;

/// Configuration parameters shared by the indexer and the retriever.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Token budget for chunks of a full transcript.
    pub transcript_max_tokens: usize,
    /// Token budget for chunks of a chapter's derived text.
    pub chapter_max_tokens: usize,
    /// Number of nearest neighbours requested from each collection.
    pub top_n: usize,
    /// Maximum number of scored chapters attached to each transcript result.
    pub max_relevant_chapters: usize,
    /// Collection holding transcript-level chunks.
    pub transcript_collection: String,
    /// Collection holding chapter-level chunks.
    pub chapter_collection: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            transcript_max_tokens: DEFAULT_TRANSCRIPT_MAX_TOKENS,
            chapter_max_tokens: DEFAULT_CHAPTER_MAX_TOKENS,
            top_n: DEFAULT_TOP_N,
            max_relevant_chapters: DEFAULT_MAX_RELEVANT_CHAPTERS,
            transcript_collection: "transcripts".to_string(),
            chapter_collection: "chapters".to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the token budget for transcript chunks.
    pub fn transcript_max_tokens(mut self, tokens: usize) -> Self {
        self.config.transcript_max_tokens = tokens;
        self
    }

    /// Set the token budget for chapter chunks.
    pub fn chapter_max_tokens(mut self, tokens: usize) -> Self {
        self.config.chapter_max_tokens = tokens;
        self
    }

    /// Set the number of nearest neighbours requested per collection.
    pub fn top_n(mut self, n: usize) -> Self {
        self.config.top_n = n;
        self
    }

    /// Set how many scored chapters are kept per transcript result.
    pub fn max_relevant_chapters(mut self, n: usize) -> Self {
        self.config.max_relevant_chapters = n;
        self
    }

    /// Set the transcript collection name.
    pub fn transcript_collection(mut self, name: impl Into<String>) -> Self {
        self.config.transcript_collection = name.into();
        self
    }

    /// Set the chapter collection name.
    pub fn chapter_collection(mut self, name: impl Into<String>) -> Self {
        self.config.chapter_collection = name.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - either token budget is zero
    /// - `top_n == 0` or `max_relevant_chapters == 0`
    /// - a collection name is empty, or both collections share a name
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.transcript_max_tokens == 0 || config.chapter_max_tokens == 0 {
            return Err(RagError::ConfigError(
                "token budgets must be greater than zero".to_string(),
            ));
        }
        if config.top_n == 0 {
            return Err(RagError::ConfigError("top_n must be greater than zero".to_string()));
        }
        if config.max_relevant_chapters == 0 {
            return Err(RagError::ConfigError(
                "max_relevant_chapters must be greater than zero".to_string(),
            ));
        }
        if config.transcript_collection.is_empty() || config.chapter_collection.is_empty() {
            return Err(RagError::ConfigError("collection names must not be empty".to_string()));
        }
        if config.transcript_collection == config.chapter_collection {
            return Err(RagError::ConfigError(format!(
                "transcript and chapter collections must differ (both '{}')",
                config.transcript_collection
            )));
        }
        Ok(config)
    }
}
