//! Embeddings from the OpenAI `/embeddings` endpoint.
//!
//! Enabled by the `openai` feature. Transcript chunks stay under the model's
//! 8191-token input limit because the default transcript budget is 7000.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const PROVIDER: &str = "OpenAI";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_MODEL: &str = "text-embedding-3-large";

/// Native size of `text-embedding-3-large`.
const DEFAULT_DIMENSIONS: usize = 3072;

/// The endpoint accepts at most this many inputs per call.
const MAX_INPUTS_PER_REQUEST: usize = 2048;

/// Embeds chunk text with an OpenAI embedding model.
///
/// ```rust,ignore
/// use vidsearch_rag::OpenAIEmbeddingProvider;
///
/// let embedder = OpenAIEmbeddingProvider::new(key)?.with_dimensions(1024);
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    truncate_to: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider authenticating with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingError`] for a blank key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Self::failure("no API key given".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dimensions: DEFAULT_DIMENSIONS,
            truncate_to: None,
        })
    }

    /// Read the key from `OPENAI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())
    }

    /// Use another model. Pair with [`with_dimensions`](Self::with_dimensions)
    /// when its native size is not 3072.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Send requests to an OpenAI-compatible server instead.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Ask the API for vectors shortened to `dims`.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.truncate_to = Some(dims);
        self
    }

    fn failure(message: String) -> RagError {
        RagError::EmbeddingError { provider: PROVIDER.to_string(), message }
    }

    /// One call to the endpoint. Vectors come back in input order.
    async fn request(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        let body = Request { model: &self.model, input: inputs, dimensions: self.truncate_to };
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                Self::failure(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiFailure>(&raw) {
                Ok(failure) => failure.error.message,
                Err(_) => raw,
            };
            error!(provider = PROVIDER, %status, "embedding API rejected request");
            return Err(Self::failure(format!("{status}: {message}")));
        }

        let mut reply: Reply = response
            .json()
            .await
            .map_err(|e| Self::failure(format!("unreadable response: {e}")))?;
        if reply.data.len() != inputs.len() {
            return Err(Self::failure(format!(
                "sent {} inputs, received {} vectors",
                inputs.len(),
                reply.data.len()
            )));
        }
        reply.data.sort_by_key(|item| item.index);
        Ok(reply.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct Reply {
    data: Vec<ReplyItem>,
}

#[derive(Deserialize)]
struct ReplyItem {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiFailure {
    error: ApiFailureDetail,
}

#[derive(Deserialize)]
struct ApiFailureDetail {
    message: String,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| Self::failure("no vector returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for slice in texts.chunks(MAX_INPUTS_PER_REQUEST) {
            debug!(
                provider = PROVIDER,
                model = %self.model,
                inputs = slice.len(),
                "embedding chunks"
            );
            vectors.extend(self.request(slice).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_rejected() {
        assert!(OpenAIEmbeddingProvider::new("  ").is_err());
    }

    #[test]
    fn defaults_match_large_model() {
        let provider = OpenAIEmbeddingProvider::new("sk-test").unwrap();
        assert_eq!(provider.dimensions(), 3072);
        assert_eq!(provider.model, "text-embedding-3-large");
        assert_eq!(provider.truncate_to, None);
    }

    #[test]
    fn shortened_vectors_change_reported_size() {
        let provider = OpenAIEmbeddingProvider::new("sk-test")
            .unwrap()
            .with_base_url("http://localhost:8080/v1/")
            .with_dimensions(256);
        assert_eq!(provider.dimensions(), 256);
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }

    #[tokio::test]
    async fn empty_batch_makes_no_request() {
        // Unroutable base URL: any request would fail.
        let provider =
            OpenAIEmbeddingProvider::new("sk-test").unwrap().with_base_url("http://127.0.0.1:9");
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
