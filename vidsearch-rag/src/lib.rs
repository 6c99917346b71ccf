//! Transcript indexing and retrieval for vidsearch.
//!
//! This crate provides:
//! - Token-budgeted chunking with sentence and word boundary preference
//! - Indexing of full transcripts and chapters into two vector collections
//! - Two-granularity search with chapter relevance scoring and merging
//! - Excerpt reconstruction from word-level timestamps
//!
//! Backends: [`InMemoryVectorIndex`] always; Chroma behind the `chroma`
//! feature; OpenAI embeddings behind the `openai` feature.

pub mod chunking;
pub mod config;
pub mod embedding;
pub mod error;
pub mod indexer;
pub mod inmemory;
pub mod materializer;
pub mod record;
pub mod retriever;
pub mod transcript;
pub mod vectorindex;

#[cfg(feature = "chroma")]
pub mod chroma;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{
    CHARS_PER_TOKEN, Chunker, DEFAULT_CHAPTER_MAX_TOKENS, DEFAULT_TRANSCRIPT_MAX_TOKENS,
    TokenBudgetChunker,
};
pub use config::{RagConfig, RagConfigBuilder};
pub use embedding::{EmbeddingProvider, LexicalEmbedder};
pub use error::{RagError, Result};
pub use indexer::{Indexer, chapter_records, transcript_records};
pub use inmemory::InMemoryVectorIndex;
pub use materializer::{ChapterExcerpt, annotate_chapters, excerpt};
pub use record::{ChapterChunkMeta, ChunkMetadata, IndexRecord, QueryHit, TranscriptChunkMeta};
pub use retriever::{Retriever, ScoredChapter, TranscriptMatch, merge_hits, relevance_score};
pub use transcript::{Chapter, Transcript, Word};
pub use vectorindex::VectorIndex;

#[cfg(feature = "chroma")]
pub use chroma::ChromaVectorIndex;
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
