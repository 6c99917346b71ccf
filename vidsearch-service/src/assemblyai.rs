//! AssemblyAI transcription engine.
//!
//! This module is only available when the `assemblyai` feature is enabled.
//! Submits media with auto-chapters enabled and polls until the transcript
//! reaches a terminal status.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use vidsearch_rag::{Chapter, Word};

use crate::error::{Result, ServiceError};
use crate::transcription::{TranscriptionEngine, TranscriptionResponse, TranscriptionStatus};

const ENGINE: &str = "AssemblyAI";

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com/v2";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// A [`TranscriptionEngine`] backed by the AssemblyAI REST API.
///
/// # Example
///
/// ```rust,ignore
/// use vidsearch_service::assemblyai::AssemblyAiEngine;
///
/// let engine = AssemblyAiEngine::new(api_key)?;
/// let response = engine.transcribe("https://example.com/talk.mp4").await?;
/// ```
pub struct AssemblyAiEngine {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
}

impl AssemblyAiEngine {
    /// Create an engine with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ServiceError::ConfigError("AssemblyAI API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override how often a pending transcript is polled.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn request_error(message: String) -> ServiceError {
        ServiceError::TranscriptionError { engine: ENGINE.into(), message }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<ApiTranscript> {
        let response = request.header("authorization", &self.api_key).send().await.map_err(|e| {
            error!(engine = ENGINE, error = %e, "request failed");
            Self::request_error(format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(engine = ENGINE, %status, "API error");
            return Err(Self::request_error(format!("API returned {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| Self::request_error(format!("failed to parse response: {e}")))
    }
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    audio_url: &'a str,
    auto_chapters: bool,
    content_safety: bool,
}

#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ApiStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

/// Offsets are integer milliseconds on the wire.
#[derive(Debug, Deserialize)]
struct ApiWord {
    text: String,
    start: u64,
    end: u64,
}

#[derive(Debug, Deserialize)]
struct ApiChapter {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    gist: String,
    start: u64,
    end: u64,
}

#[derive(Debug, Deserialize)]
struct ApiTranscript {
    id: String,
    status: ApiStatus,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    words: Option<Vec<ApiWord>>,
    #[serde(default)]
    chapters: Option<Vec<ApiChapter>>,
}

fn seconds(millis: u64) -> f64 {
    millis as f64 / 1000.0
}

impl ApiTranscript {
    fn is_terminal(&self) -> bool {
        matches!(self.status, ApiStatus::Completed | ApiStatus::Error)
    }

    fn into_response(self) -> TranscriptionResponse {
        let status = if self.status == ApiStatus::Error {
            TranscriptionStatus::Error
        } else {
            TranscriptionStatus::Completed
        };
        TranscriptionResponse {
            id: self.id,
            status,
            error: self.error,
            text: self.text,
            words: self.words.map(|words| {
                words
                    .into_iter()
                    .map(|w| Word::new(w.text, seconds(w.start), seconds(w.end)))
                    .collect()
            }),
            chapters: self.chapters.map(|chapters| {
                chapters
                    .into_iter()
                    .map(|c| Chapter {
                        headline: c.headline,
                        summary: c.summary,
                        gist: c.gist,
                        start: seconds(c.start),
                        end: seconds(c.end),
                    })
                    .collect()
            }),
        }
    }
}

#[async_trait]
impl TranscriptionEngine for AssemblyAiEngine {
    fn name(&self) -> &str {
        ENGINE
    }

    async fn transcribe(&self, media_url: &str) -> Result<TranscriptionResponse> {
        let submit =
            SubmitRequest { audio_url: media_url, auto_chapters: true, content_safety: true };
        let mut transcript = self
            .send(self.client.post(format!("{}/transcript", self.base_url)).json(&submit))
            .await?;
        debug!(engine = ENGINE, transcript_id = %transcript.id, "submitted media");

        while !transcript.is_terminal() {
            tokio::time::sleep(self.poll_interval).await;
            let url = format!("{}/transcript/{}", self.base_url, transcript.id);
            transcript = self.send(self.client.get(url)).await?;
            debug!(
                engine = ENGINE,
                transcript_id = %transcript.id,
                status = ?transcript.status,
                "polled"
            );
        }

        Ok(transcript.into_response())
    }
}
