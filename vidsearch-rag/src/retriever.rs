//! Two-granularity retrieval with chapter relevance merging.
//!
//! A search queries the transcript and chapter collections independently,
//! turns chapter distances into integer relevance scores, and attaches each
//! transcript hit's best-scoring chapters to it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::record::QueryHit;
use crate::vectorindex::VectorIndex;

/// Lower bound of the normalizing distance, keeps the divisor non-zero.
const MIN_MAX_DISTANCE: f64 = 1.0;

/// A chapter hit scored against its query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChapter {
    /// The matched chapter chunk text.
    pub content: String,
    /// Chapter start in seconds.
    pub start: f64,
    /// Chapter end in seconds.
    pub end: f64,
    /// Relevance from 1 (least) to 5 (most); see [`relevance_score`].
    pub score: i64,
}

/// One transcript-level hit with its most relevant chapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptMatch {
    /// The matched transcript.
    pub transcript_id: String,
    /// The matched transcript chunk text.
    pub text: String,
    /// Best chapters of this transcript, highest score first.
    pub chapters: Vec<ScoredChapter>,
}

/// The largest chapter distance, floored at 1.
pub fn max_distance(hits: &[QueryHit]) -> f64 {
    hits.iter().map(|hit| hit.distance).fold(MIN_MAX_DISTANCE, f64::max)
}

/// Map a raw distance onto the 1..=5 relevance scale: `round((1 - d/max) * 4 + 1)`.
///
/// Halves round up. The result is not clamped, so a distance above
/// `max_distance` yields a score below 1.
pub fn relevance_score(distance: f64, max_distance: f64) -> i64 {
    let scaled = (1.0 - distance / max_distance) * 4.0 + 1.0;
    (scaled + 0.5).floor() as i64
}

/// Score chapter hits and attach them to the transcript hits they belong to.
///
/// Produces one [`TranscriptMatch`] per transcript hit, in transcript hit
/// order. Chapters are sorted by descending score; equal scores keep their
/// chapter-query order. At most `limit` chapters are kept per transcript.
pub fn merge_hits(
    transcript_hits: &[QueryHit],
    chapter_hits: &[QueryHit],
    limit: usize,
) -> Vec<TranscriptMatch> {
    let max = max_distance(chapter_hits);
    let scored: Vec<(&str, ScoredChapter)> = chapter_hits
        .iter()
        .filter_map(|hit| {
            let (start, end) = hit.metadata.chapter_range()?;
            Some((
                hit.metadata.transcript_id(),
                ScoredChapter {
                    content: hit.document.clone(),
                    start,
                    end,
                    score: relevance_score(hit.distance, max),
                },
            ))
        })
        .collect();

    transcript_hits
        .iter()
        .map(|hit| {
            let transcript_id = hit.metadata.transcript_id();
            let mut chapters: Vec<ScoredChapter> = scored
                .iter()
                .filter(|(owner, _)| *owner == transcript_id)
                .map(|(_, chapter)| chapter.clone())
                .collect();
            // `sort_by` is stable.
            chapters.sort_by(|a, b| b.score.cmp(&a.score));
            chapters.truncate(limit);

            TranscriptMatch {
                transcript_id: transcript_id.to_string(),
                text: hit.document.clone(),
                chapters,
            }
        })
        .collect()
}

/// Runs searches over both collections of a [`VectorIndex`].
///
/// Stateless apart from its handles; safe to share across concurrent callers.
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    config: RagConfig,
}

impl Retriever {
    /// Create a retriever over `index`.
    pub fn new(index: Arc<dyn VectorIndex>, config: RagConfig) -> Self {
        Self { index, config }
    }

    /// Return a reference to the configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Search both collections for `term` and merge the results.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::RetrievalError`] if either collection query fails.
    pub async fn search(&self, term: &str) -> Result<Vec<TranscriptMatch>> {
        let top_n = self.config.top_n;
        let transcripts = &self.config.transcript_collection;
        let chapters = &self.config.chapter_collection;

        let (transcript_hits, chapter_hits) = tokio::try_join!(
            self.query(transcripts, term, top_n),
            self.query(chapters, term, top_n),
        )?;
        debug!(
            transcript_hits = transcript_hits.len(),
            chapter_hits = chapter_hits.len(),
            "collection queries returned"
        );

        let matches =
            merge_hits(&transcript_hits, &chapter_hits, self.config.max_relevant_chapters);
        info!(term, result_count = matches.len(), "search completed");
        Ok(matches)
    }

    async fn query(&self, collection: &str, term: &str, top_n: usize) -> Result<Vec<QueryHit>> {
        self.index.query(collection, term, top_n).await.map_err(|e| {
            error!(collection, error = %e, "collection query failed");
            RagError::RetrievalError(format!("query on '{collection}' failed: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ChapterChunkMeta, TranscriptChunkMeta};

    fn transcript_hit(id: &str, distance: f64) -> QueryHit {
        QueryHit {
            id: id.into(),
            document: format!("{id} text"),
            metadata: TranscriptChunkMeta {
                transcript_id: id.into(),
                user_id: None,
                chunk_index: None,
            }
            .into(),
            distance,
        }
    }

    fn chapter_hit(transcript_id: &str, start: f64, distance: f64) -> QueryHit {
        QueryHit {
            id: format!("{transcript_id}-chapter-{start}"),
            document: format!("{transcript_id}@{start}"),
            metadata: ChapterChunkMeta {
                transcript_id: transcript_id.into(),
                start,
                end: start + 10.0,
            }
            .into(),
            distance,
        }
    }

    #[test]
    fn max_distance_is_floored_at_one() {
        assert_eq!(max_distance(&[]), 1.0);
        assert_eq!(max_distance(&[chapter_hit("a", 0.0, 0.3)]), 1.0);
        assert_eq!(max_distance(&[chapter_hit("a", 0.0, 1.6)]), 1.6);
    }

    #[test]
    fn score_spans_one_to_five() {
        assert_eq!(relevance_score(0.0, 2.0), 5);
        assert_eq!(relevance_score(2.0, 2.0), 1);
        assert_eq!(relevance_score(1.0, 2.0), 3);
    }

    #[test]
    fn halves_round_up() {
        // (1 - 0.375) * 4 + 1 = 3.5
        assert_eq!(relevance_score(0.375, 1.0), 4);
    }

    #[test]
    fn score_is_not_clamped_past_max_distance() {
        assert_eq!(relevance_score(2.0, 1.0), -3);
    }

    #[test]
    fn merges_chapters_onto_their_transcripts() {
        let transcripts = [transcript_hit("A", 0.1), transcript_hit("B", 0.2)];
        // max distance 1.0 -> scores 5, 3, 4
        let chapters =
            [chapter_hit("A", 10.0, 0.0), chapter_hit("A", 0.0, 0.5), chapter_hit("B", 20.0, 0.25)];

        let merged = merge_hits(&transcripts, &chapters, 3);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].transcript_id, "A");
        let a_scores: Vec<i64> = merged[0].chapters.iter().map(|c| c.score).collect();
        assert_eq!(a_scores, [5, 3]);
        assert_eq!(merged[0].chapters[0].start, 10.0);
        assert_eq!(merged[1].chapters.len(), 1);
        assert_eq!(merged[1].chapters[0].score, 4);
    }

    #[test]
    fn equal_scores_keep_query_order_and_limit_applies() {
        let transcripts = [transcript_hit("A", 0.1)];
        let chapters: Vec<QueryHit> =
            (0..5).map(|i| chapter_hit("A", f64::from(i) * 10.0, 0.0)).collect();

        let merged = merge_hits(&transcripts, &chapters, 3);
        let starts: Vec<f64> = merged[0].chapters.iter().map(|c| c.start).collect();
        assert_eq!(starts, [0.0, 10.0, 20.0]);
    }

    #[test]
    fn transcript_without_chapters_has_empty_list() {
        let merged = merge_hits(&[transcript_hit("A", 0.0)], &[chapter_hit("B", 0.0, 0.1)], 3);
        assert!(merged[0].chapters.is_empty());
    }
}
