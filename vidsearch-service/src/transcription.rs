//! Transcription engine seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vidsearch_rag::{Chapter, Transcript, Word};

use crate::error::Result;

/// Terminal status reported by a transcription engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionStatus {
    /// The media was transcribed.
    #[serde(alias = "ok")]
    Completed,
    /// The engine gave up on the media.
    Error,
}

/// What a transcription engine returns for one media URL.
///
/// Offsets in `words` and `chapters` are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionResponse {
    /// Engine-assigned transcript id.
    pub id: String,
    /// Terminal status.
    pub status: TranscriptionStatus,
    /// Reason for an `Error` status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Full text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Word-level timestamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
    /// Detected chapters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapters: Option<Vec<Chapter>>,
}

/// A transcription response resolved against its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionOutcome {
    /// The transcript is ready to be stored and indexed.
    Completed(Transcript),
    /// The engine reported a terminal error for this media.
    Failed {
        /// Engine-assigned transcript id.
        transcript_id: String,
        /// The engine's reason, or a placeholder when none was given.
        reason: String,
    },
}

impl TranscriptionResponse {
    /// A completed response.
    pub fn completed(
        id: impl Into<String>,
        text: impl Into<String>,
        words: Vec<Word>,
        chapters: Vec<Chapter>,
    ) -> Self {
        Self {
            id: id.into(),
            status: TranscriptionStatus::Completed,
            error: None,
            text: Some(text.into()),
            words: Some(words),
            chapters: Some(chapters),
        }
    }

    /// A terminally failed response.
    pub fn failed(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: TranscriptionStatus::Error,
            error: Some(error.into()),
            text: None,
            words: None,
            chapters: None,
        }
    }

    /// Resolve into a [`Transcript`] owned by `user_id`, or the terminal failure.
    ///
    /// Missing text, words, or chapters become empty values.
    pub fn into_outcome(self, user_id: &str) -> TranscriptionOutcome {
        match self.status {
            TranscriptionStatus::Error => TranscriptionOutcome::Failed {
                transcript_id: self.id,
                reason: self.error.unwrap_or_else(|| "unknown transcription error".to_string()),
            },
            TranscriptionStatus::Completed => TranscriptionOutcome::Completed(Transcript {
                id: self.id,
                user_id: user_id.to_string(),
                text: self.text.unwrap_or_default(),
                words: self.words.unwrap_or_default(),
                chapters: self.chapters.unwrap_or_default(),
            }),
        }
    }
}

/// An engine that turns a media URL into a transcript.
///
/// `Err` means the engine could not be asked or did not answer (transient);
/// a terminal per-media failure is an `Ok` response with
/// [`TranscriptionStatus::Error`].
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// A short name used in logs and errors.
    fn name(&self) -> &str;

    /// Transcribe the media at `media_url`, waiting for a terminal status.
    async fn transcribe(&self, media_url: &str) -> Result<TranscriptionResponse>;
}
