//! Transcript and chapter indexing.
//!
//! The [`Indexer`] turns a transcript's full text and its chapters into
//! [`IndexRecord`]s and writes them to the two collections of a
//! [`VectorIndex`].
//!
//! Record ids:
//!
//! | source | single chunk | split into chunks |
//! |---|---|---|
//! | transcript | `{id}` | `{id}-chunk-{i}` |
//! | chapter `c` | `{id}-chapter-{c}` | `{id}-chapter-{c}-chunk-{j}` |
//!
//! Indexing is idempotent by transcript id: records previously written for the
//! same transcript are removed before the new ones are upserted.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::chunking::{Chunker, TokenBudgetChunker};
use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::record::{ChapterChunkMeta, IndexRecord, TranscriptChunkMeta};
use crate::transcript::Chapter;
use crate::vectorindex::VectorIndex;

/// Build the records for a transcript's full text.
pub fn transcript_records(
    transcript_id: &str,
    text: &str,
    user_id: &str,
    chunker: &dyn Chunker,
) -> Vec<IndexRecord> {
    let chunks = chunker.chunk(text);
    let user_id = (!user_id.is_empty()).then(|| user_id.to_string());

    if chunks.len() == 1 {
        let document = chunks.into_iter().next().unwrap_or_default();
        return vec![IndexRecord {
            id: transcript_id.to_string(),
            document,
            metadata: TranscriptChunkMeta {
                transcript_id: transcript_id.to_string(),
                user_id,
                chunk_index: None,
            }
            .into(),
        }];
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, document)| IndexRecord {
            id: format!("{transcript_id}-chunk-{i}"),
            document,
            metadata: TranscriptChunkMeta {
                transcript_id: transcript_id.to_string(),
                user_id: user_id.clone(),
                chunk_index: Some(i),
            }
            .into(),
        })
        .collect()
}

/// Build the records for a transcript's chapters, in chapter order.
pub fn chapter_records(
    transcript_id: &str,
    chapters: &[Chapter],
    chunker: &dyn Chunker,
) -> Vec<IndexRecord> {
    let mut records = Vec::new();

    for (i, chapter) in chapters.iter().enumerate() {
        let chunks = chunker.chunk(&chapter.indexed_text());
        let split = chunks.len() > 1;

        for (j, document) in chunks.into_iter().enumerate() {
            let id = if split {
                format!("{transcript_id}-chapter-{i}-chunk-{j}")
            } else {
                format!("{transcript_id}-chapter-{i}")
            };
            records.push(IndexRecord {
                id,
                document,
                metadata: ChapterChunkMeta {
                    transcript_id: transcript_id.to_string(),
                    start: chapter.start,
                    end: chapter.end,
                }
                .into(),
            });
        }
    }

    records
}

/// Writes transcripts and chapters to a [`VectorIndex`].
///
/// Write failures are not retried; they surface as [`RagError::IndexingError`]
/// and the caller decides whether to re-run.
pub struct Indexer {
    index: Arc<dyn VectorIndex>,
    config: RagConfig,
    transcript_chunker: Arc<dyn Chunker>,
    chapter_chunker: Arc<dyn Chunker>,
}

impl Indexer {
    /// Create an indexer whose chunk budgets come from `config`.
    pub fn new(index: Arc<dyn VectorIndex>, config: RagConfig) -> Self {
        let transcript_chunker = Arc::new(TokenBudgetChunker::new(config.transcript_max_tokens));
        let chapter_chunker = Arc::new(TokenBudgetChunker::new(config.chapter_max_tokens));
        Self { index, config, transcript_chunker, chapter_chunker }
    }

    /// Replace the chunker used for full transcripts.
    pub fn with_transcript_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.transcript_chunker = chunker;
        self
    }

    /// Replace the chunker used for chapter text.
    pub fn with_chapter_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chapter_chunker = chunker;
        self
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Create both collections if they do not exist yet.
    pub async fn ensure_collections(&self) -> Result<()> {
        self.index.ensure_collection(&self.config.transcript_collection).await?;
        self.index.ensure_collection(&self.config.chapter_collection).await
    }

    /// Index a transcript's full text. Returns the number of records written.
    ///
    /// Blank text writes nothing and is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexingError`] if the index rejects the delete or upsert.
    pub async fn index_transcript(
        &self,
        transcript_id: &str,
        text: &str,
        user_id: &str,
    ) -> Result<usize> {
        if text.trim().is_empty() {
            info!(transcript_id, "transcript text is empty, nothing to index");
            return Ok(0);
        }

        let records =
            transcript_records(transcript_id, text, user_id, self.transcript_chunker.as_ref());
        debug!(transcript_id, chunk_count = records.len(), "split transcript into chunks");

        self.replace(&self.config.transcript_collection, transcript_id, &records).await?;
        info!(transcript_id, chunk_count = records.len(), "indexed transcript");
        Ok(records.len())
    }

    /// Index a transcript's chapters. Returns the number of records written.
    ///
    /// A transcript without chapters writes nothing and is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexingError`] if the index rejects the delete or upsert.
    pub async fn index_chapters(&self, transcript_id: &str, chapters: &[Chapter]) -> Result<usize> {
        if chapters.is_empty() {
            info!(transcript_id, "transcript has no chapters, nothing to index");
            return Ok(0);
        }

        let records = chapter_records(transcript_id, chapters, self.chapter_chunker.as_ref());
        self.replace(&self.config.chapter_collection, transcript_id, &records).await?;
        info!(
            transcript_id,
            chapter_count = chapters.len(),
            chunk_count = records.len(),
            "indexed chapters"
        );
        Ok(records.len())
    }

    /// Drop whatever the transcript had in `collection`, then write `records`.
    async fn replace(
        &self,
        collection: &str,
        transcript_id: &str,
        records: &[IndexRecord],
    ) -> Result<()> {
        let wrap = |e: RagError| {
            error!(transcript_id, collection, error = %e, "index write failed");
            RagError::IndexingError {
                transcript_id: transcript_id.to_string(),
                message: format!("write to '{collection}' failed: {e}"),
            }
        };

        self.index.delete_transcript(collection, transcript_id).await.map_err(wrap)?;
        self.index.upsert(collection, records).await.map_err(wrap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ChunkMetadata;

    fn chapter(headline: &str, start: f64, end: f64) -> Chapter {
        Chapter {
            headline: headline.into(),
            summary: "summary".into(),
            gist: "gist".into(),
            start,
            end,
        }
    }

    #[test]
    fn single_chunk_transcript_uses_bare_id() {
        let records = transcript_records("t1", "short text", "u1", &TokenBudgetChunker::new(100));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "t1");
        assert_eq!(
            records[0].metadata,
            ChunkMetadata::Transcript(TranscriptChunkMeta {
                transcript_id: "t1".into(),
                user_id: Some("u1".into()),
                chunk_index: None,
            })
        );
    }

    #[test]
    fn split_transcript_numbers_chunks_from_zero() {
        let records = transcript_records("t1", "abcdefghij", "", &TokenBudgetChunker::new(1));
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["t1-chunk-0", "t1-chunk-1", "t1-chunk-2"]);
        match &records[2].metadata {
            ChunkMetadata::Transcript(meta) => {
                assert_eq!(meta.chunk_index, Some(2));
                assert_eq!(meta.user_id, None);
            }
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn split_chapter_shares_chapter_range() {
        let chapters = vec![chapter("a", 0.0, 10.0), chapter("a much longer headline", 10.0, 20.0)];
        // 4 token budget = 16 chars; the first chapter text ("a\nsummary\ngist") fits.
        let records = chapter_records("t1", &chapters, &TokenBudgetChunker::new(4));

        assert_eq!(records[0].id, "t1-chapter-0");
        assert!(records.len() > 2);
        for record in &records[1..] {
            assert!(record.id.starts_with("t1-chapter-1-chunk-"));
            assert_eq!(record.metadata.chapter_range(), Some((10.0, 20.0)));
        }
    }

    #[test]
    fn no_chapters_no_records() {
        assert!(chapter_records("t1", &[], &TokenBudgetChunker::for_chapters()).is_empty());
    }
}
