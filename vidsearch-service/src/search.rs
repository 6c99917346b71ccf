//! Search response composition.
//!
//! Joins the retriever's hits with the relational store so that each result
//! carries its video's metadata and every chapter with its spoken text.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use vidsearch_rag::{ChapterExcerpt, Retriever, ScoredChapter, TranscriptMatch, annotate_chapters};

use crate::error::Result;
use crate::store::VideoStore;

const UNTITLED: &str = "Untitled Video";
const INTERNAL_ERROR: &str = "Internal server error";

/// One search result, ready for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// The matched transcript.
    #[serde(rename = "transcription_id")]
    pub transcript_id: String,
    /// Media URL, empty when no record exists.
    pub video_url: String,
    /// The matched transcript chunk.
    pub text: String,
    /// Video title.
    pub title: String,
    /// Every chapter of the transcript.
    pub chapters: Vec<ChapterExcerpt>,
    /// Thumbnail URL, empty when no record exists.
    pub thumbnail: String,
    /// The best chapters for the query, highest score first.
    pub relevant_chapters: Vec<ScoredChapter>,
}

/// The response to a search request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SearchPayload {
    /// Search succeeded.
    #[serde(rename_all = "camelCase")]
    Results {
        /// The search term as given.
        query: String,
        /// `results.len()`.
        total_results: usize,
        /// Results in retriever order.
        results: Vec<SearchResult>,
        /// Always empty.
        related_content: Vec<serde_json::Value>,
    },
    /// Search failed; details are only logged.
    Error {
        /// A fixed message.
        error: String,
    },
}

impl SearchPayload {
    fn internal_error() -> Self {
        Self::Error { error: INTERNAL_ERROR.to_string() }
    }

    /// The results, or `None` for an error payload.
    pub fn results(&self) -> Option<&[SearchResult]> {
        match self {
            Self::Results { results, .. } => Some(results),
            Self::Error { .. } => None,
        }
    }
}

/// Answers search requests from the index and the relational store.
pub struct SearchService {
    retriever: Arc<Retriever>,
    store: Arc<dyn VideoStore>,
}

impl SearchService {
    /// Create a search service.
    pub fn new(retriever: Arc<Retriever>, store: Arc<dyn VideoStore>) -> Self {
        Self { retriever, store }
    }

    /// Search for `term`. Never fails: errors are logged and reported as
    /// [`SearchPayload::Error`].
    pub async fn search(&self, term: &str) -> SearchPayload {
        debug!(term, "searching");
        match self.try_search(term).await {
            Ok(results) => SearchPayload::Results {
                query: term.to_string(),
                total_results: results.len(),
                results,
                related_content: Vec::new(),
            },
            Err(e) => {
                error!(term, error = %e, "search failed");
                SearchPayload::internal_error()
            }
        }
    }

    async fn try_search(&self, term: &str) -> Result<Vec<SearchResult>> {
        let matches = self.retriever.search(term).await?;
        try_join_all(matches.into_iter().map(|m| self.compose(m))).await
    }

    async fn compose(&self, matched: TranscriptMatch) -> Result<SearchResult> {
        let record = self.store.find_by_transcript_id(&matched.transcript_id).await?;
        let Some(record) = record else {
            debug!(transcript_id = %matched.transcript_id, "no video record for hit");
            return Ok(SearchResult {
                transcript_id: matched.transcript_id,
                video_url: String::new(),
                text: matched.text,
                title: UNTITLED.to_string(),
                chapters: Vec::new(),
                thumbnail: String::new(),
                relevant_chapters: matched.chapters,
            });
        };

        let transcript = record.transcript()?;
        let title =
            if record.title.trim().is_empty() { UNTITLED.to_string() } else { record.title };
        Ok(SearchResult {
            chapters: annotate_chapters(&transcript, &matched.chapters),
            transcript_id: matched.transcript_id,
            video_url: record.video_url,
            text: matched.text,
            title,
            thumbnail: record.video_thumbnail_url,
            relevant_chapters: matched.chapters,
        })
    }

    /// The spoken text of a stored transcript between `start` and `end` seconds.
    ///
    /// A transcript without a stored record has no words, so its excerpt is
    /// empty.
    pub async fn excerpt_for(&self, transcript_id: &str, start: f64, end: f64) -> Result<String> {
        match self.store.find_by_transcript_id(transcript_id).await? {
            Some(record) => Ok(record.transcript()?.excerpt(start, end)),
            None => {
                debug!(transcript_id, "no video record, excerpt is empty");
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_payload_has_fixed_shape() {
        let json = serde_json::to_value(SearchPayload::internal_error()).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
    }

    #[test]
    fn results_envelope_uses_wire_names() {
        let payload = SearchPayload::Results {
            query: "rust".into(),
            total_results: 0,
            results: Vec::new(),
            related_content: Vec::new(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "query": "rust",
                "totalResults": 0,
                "results": [],
                "relatedContent": [],
            })
        );
        assert_eq!(payload.results().map(<[_]>::len), Some(0));
    }
}
