//! Vector index trait for storing and querying transcript chunks.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::{IndexRecord, QueryHit};

/// A nearest-neighbour store of text chunks, partitioned into named collections.
///
/// Implementations embed documents themselves (or delegate to a server that
/// does), so callers only deal with text and typed metadata.
///
/// # Example
///
/// ```rust,ignore
/// use vidsearch_rag::{InMemoryVectorIndex, LexicalEmbedder, VectorIndex};
///
/// let index = InMemoryVectorIndex::new(Arc::new(LexicalEmbedder::new()));
/// index.ensure_collection("chapters").await?;
/// index.upsert("chapters", &records).await?;
/// let hits = index.query("chapters", "borrow checker", 10).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create a named collection. No-op if it already exists.
    async fn ensure_collection(&self, name: &str) -> Result<()>;

    /// Insert or replace records by id.
    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()>;

    /// Remove every record whose metadata `transcript_id` equals `transcript_id`.
    async fn delete_transcript(&self, collection: &str, transcript_id: &str) -> Result<()>;

    /// Return up to `top_n` records nearest to `query_text`, ordered by
    /// ascending distance.
    async fn query(&self, collection: &str, query_text: &str, top_n: usize)
    -> Result<Vec<QueryHit>>;
}
