//! Ingestion orchestrator.
//!
//! Each work item moves through `Queued → Transcribing → Indexed | Failed`.
//! After a successful transcription three independent effects run
//! concurrently: the relational insert, transcript indexing, and chapter
//! indexing. All three are always attempted. They are not atomic: if one
//! fails, the others may already have written, which leaves a partial state
//! that re-running the item repairs (index writes replace by transcript id;
//! the relational insert appends another row).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info, warn};
use vidsearch_rag::{Indexer, Transcript};

use crate::config::DEFAULT_MAX_ATTEMPTS;
use crate::error::{Result, ServiceError};
use crate::queue::{Delivery, WorkItem, WorkReceiver};
use crate::store::{VideoRecord, VideoStore};
use crate::transcription::{TranscriptionEngine, TranscriptionOutcome, TranscriptionResponse};

/// Lifecycle state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ItemState {
    /// Waiting in the queue.
    Queued,
    /// Handed to the transcription engine.
    Transcribing,
    /// Stored and indexed.
    Indexed,
    /// Given up on.
    Failed,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Queued => "queued",
            Self::Transcribing => "transcribing",
            Self::Indexed => "indexed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A work item that was stored and indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indexed {
    /// Title of the work item.
    pub title: String,
    /// Engine-assigned transcript id.
    pub transcript_id: String,
    /// Records written to the transcript collection.
    pub transcript_chunks: usize,
    /// Records written to the chapter collection.
    pub chapter_chunks: usize,
}

/// A work item that was given up on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failed {
    /// Title of the work item.
    pub title: String,
    /// Engine-assigned transcript id, when transcription got that far.
    pub transcript_id: Option<String>,
    /// Why the item failed.
    pub reason: String,
    /// Whether re-running the item might succeed.
    pub retryable: bool,
}

/// The result of processing one work item.
pub type ItemOutcome = std::result::Result<Indexed, Failed>;

/// Per-item outcomes of a batch, in processing order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// One entry per processed item.
    pub outcomes: Vec<ItemOutcome>,
}

impl BatchSummary {
    /// Number of items that were indexed.
    pub fn indexed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Number of items that failed.
    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_err()).count()
    }
}

/// Drives work items through transcription, storage, and indexing.
pub struct Orchestrator {
    engine: Arc<dyn TranscriptionEngine>,
    store: Arc<dyn VideoStore>,
    indexer: Arc<Indexer>,
    transcribe_timeout: Option<Duration>,
    max_attempts: u32,
}

impl Orchestrator {
    /// Create an orchestrator over the given collaborators.
    pub fn new(
        engine: Arc<dyn TranscriptionEngine>,
        store: Arc<dyn VideoStore>,
        indexer: Arc<Indexer>,
    ) -> Self {
        Self {
            engine,
            store,
            indexer,
            transcribe_timeout: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Bound each transcription call; an expired call counts as a transient failure.
    pub fn with_transcribe_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.transcribe_timeout = timeout;
        self
    }

    /// Set how many deliveries an item gets before it is reported failed.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Process one work item.
    ///
    /// A terminal transcription error is `Ok(Err(Failed))`: nothing is
    /// written. `Err` is a transient failure of an external call.
    pub async fn process(&self, item: &WorkItem) -> Result<ItemOutcome> {
        info!(title = %item.title, state = %ItemState::Transcribing, "processing work item");

        let response = self.transcribe(&item.video_url).await?;
        let transcript = match response.into_outcome(&item.user_id) {
            TranscriptionOutcome::Completed(transcript) => transcript,
            TranscriptionOutcome::Failed { transcript_id, reason } => {
                error!(
                    title = %item.title,
                    transcript_id = %transcript_id,
                    state = %ItemState::Failed,
                    reason = %reason,
                    "transcription failed"
                );
                return Ok(Err(Failed {
                    title: item.title.clone(),
                    transcript_id: Some(transcript_id),
                    reason,
                    retryable: false,
                }));
            }
        };

        let indexed = self.store_and_index(item, &transcript).await?;
        info!(
            title = %item.title,
            transcript_id = %indexed.transcript_id,
            state = %ItemState::Indexed,
            transcript_chunks = indexed.transcript_chunks,
            chapter_chunks = indexed.chapter_chunks,
            "work item indexed"
        );
        Ok(Ok(indexed))
    }

    async fn transcribe(&self, media_url: &str) -> Result<TranscriptionResponse> {
        let call = self.engine.transcribe(media_url);
        match self.transcribe_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                ServiceError::TranscriptionError {
                    engine: self.engine.name().to_string(),
                    message: format!("no terminal status after {}s", limit.as_secs()),
                }
            })?,
            None => call.await,
        }
    }

    /// Run the three post-transcription effects concurrently and join them.
    async fn store_and_index(&self, item: &WorkItem, transcript: &Transcript) -> Result<Indexed> {
        let record = VideoRecord::from_transcript(item, transcript)?;

        let (stored, transcript_chunks, chapter_chunks) = tokio::join!(
            self.store.insert(&record),
            self.indexer.index_transcript(&transcript.id, &transcript.text, &item.user_id),
            self.indexer.index_chapters(&transcript.id, &transcript.chapters),
        );

        let failures: Vec<String> = [
            stored.as_ref().err().map(|e| format!("store: {e}")),
            transcript_chunks.as_ref().err().map(|e| format!("transcript index: {e}")),
            chapter_chunks.as_ref().err().map(|e| format!("chapter index: {e}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !failures.is_empty() {
            error!(
                title = %item.title,
                transcript_id = %transcript.id,
                failures = ?failures,
                "post-transcription effects partially failed, re-run the item to repair"
            );
        }

        stored?;
        Ok(Indexed {
            title: item.title.clone(),
            transcript_id: transcript.id.clone(),
            transcript_chunks: transcript_chunks?,
            chapter_chunks: chapter_chunks?,
        })
    }

    /// Process `items` one after another, isolating failures per item.
    ///
    /// Transient errors are not retried here; they are reported as
    /// [`Failed`] entries with `retryable` set.
    pub async fn run_batch(&self, items: &[WorkItem]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for item in items {
            let outcome = match self.process(item).await {
                Ok(outcome) => outcome,
                Err(e) => Err(self.give_up(item, &e)),
            };
            summary.outcomes.push(outcome);
        }
        info!(indexed = summary.indexed(), failed = summary.failed(), "batch finished");
        summary
    }

    /// Consume deliveries until the queue closes.
    pub async fn run(&self, receiver: &mut WorkReceiver) -> BatchSummary {
        let mut summary = BatchSummary::default();
        while let Some(delivery) = receiver.recv().await {
            if let Some(outcome) = self.handle(delivery, receiver).await {
                summary.outcomes.push(outcome);
            }
        }
        info!(indexed = summary.indexed(), failed = summary.failed(), "worker stopped");
        summary
    }

    /// Consume deliveries until none is ready, including redeliveries.
    pub async fn drain(&self, receiver: &mut WorkReceiver) -> BatchSummary {
        let mut summary = BatchSummary::default();
        while let Some(delivery) = receiver.try_recv() {
            if let Some(outcome) = self.handle(delivery, receiver).await {
                summary.outcomes.push(outcome);
            }
        }
        info!(indexed = summary.indexed(), failed = summary.failed(), "queue drained");
        summary
    }

    /// Process one delivery. Returns `None` when the item was redelivered.
    async fn handle(&self, delivery: Delivery, receiver: &mut WorkReceiver) -> Option<ItemOutcome> {
        match self.process(&delivery.item).await {
            Ok(outcome) => Some(outcome),
            Err(e) if e.is_transient() && delivery.attempt < self.max_attempts => {
                warn!(
                    title = %delivery.item.title,
                    attempt = delivery.attempt,
                    max_attempts = self.max_attempts,
                    error = %e,
                    "transient failure, redelivering"
                );
                receiver.redeliver(delivery);
                None
            }
            Err(e) => Some(Err(self.give_up(&delivery.item, &e))),
        }
    }

    fn give_up(&self, item: &WorkItem, e: &ServiceError) -> Failed {
        error!(title = %item.title, state = %ItemState::Failed, error = %e, "work item failed");
        Failed {
            title: item.title.clone(),
            transcript_id: None,
            reason: e.to_string(),
            retryable: e.is_transient(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(title: &str) -> Failed {
        Failed { title: title.into(), transcript_id: None, reason: "boom".into(), retryable: false }
    }

    #[test]
    fn summary_counts_each_side() {
        let summary = BatchSummary {
            outcomes: vec![
                Ok(Indexed {
                    title: "a".into(),
                    transcript_id: "t1".into(),
                    transcript_chunks: 1,
                    chapter_chunks: 2,
                }),
                Err(failed("b")),
                Err(failed("c")),
            ],
        };
        assert_eq!(summary.indexed(), 1);
        assert_eq!(summary.failed(), 2);
    }

    #[test]
    fn states_display_lowercase() {
        assert_eq!(ItemState::Queued.to_string(), "queued");
        assert_eq!(ItemState::Indexed.to_string(), "indexed");
    }
}
