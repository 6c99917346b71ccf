//! Chroma vector index backend.
//!
//! Provides [`ChromaVectorIndex`] which implements [`VectorIndex`] against the
//! Chroma v2 REST API (Chroma 1.x servers). Collections live under a tenant and
//! a database, `default_tenant` and `default_database` unless configured.
//! Embeddings are computed client-side with an [`EmbeddingProvider`] and sent
//! alongside documents.
//!
//! This module is only available when the `chroma` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use vidsearch_rag::chroma::ChromaVectorIndex;
//!
//! let index = ChromaVectorIndex::new("http://localhost:8000", Arc::new(embedder));
//! index.ensure_collection("transcripts").await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::record::{ChunkMetadata, IndexRecord, QueryHit};
use crate::vectorindex::VectorIndex;

const BACKEND: &str = "chroma";

/// Tenant every Chroma server creates on startup.
pub const DEFAULT_TENANT: &str = "default_tenant";

/// Database every Chroma server creates on startup.
pub const DEFAULT_DATABASE: &str = "default_database";

/// A [`VectorIndex`] backed by a [Chroma](https://www.trychroma.com/) server.
pub struct ChromaVectorIndex {
    client: reqwest::Client,
    base_url: String,
    tenant: String,
    database: String,
    embedder: Arc<dyn EmbeddingProvider>,
    /// Collection name → Chroma collection id.
    collection_ids: RwLock<HashMap<String, String>>,
}

impl ChromaVectorIndex {
    /// Create an index talking to the Chroma server at `base_url`.
    pub fn new(base_url: impl Into<String>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tenant: DEFAULT_TENANT.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            embedder,
            collection_ids: RwLock::new(HashMap::new()),
        }
    }

    /// Create an index from a host and port, e.g. `("localhost", 8000)`.
    pub fn from_host(host: &str, port: u16, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let base = if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{port}")
        } else {
            format!("http://{host}:{port}")
        };
        Self::new(base, embedder)
    }

    /// Use collections of another tenant.
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = tenant.into();
        self
    }

    /// Use collections of another database.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Full URL of `path`, relative to the configured database.
    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/v2/tenants/{}/databases/{}/{path}",
            self.base_url, self.tenant, self.database
        )
    }

    fn map_err(e: impl std::fmt::Display) -> RagError {
        RagError::VectorIndexError { backend: BACKEND.to_string(), message: e.to_string() }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value> {
        let url = self.url(path);
        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            error!(backend = BACKEND, url = %url, error = %e, "request failed");
            Self::map_err(format!("request to {path} failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, path, "API error");
            return Err(Self::map_err(format!("{path} returned {status}: {body}")));
        }

        response.json().await.map_err(|e| Self::map_err(format!("invalid response: {e}")))
    }

    /// Resolve a collection name to its Chroma id, creating it if needed.
    async fn collection_id(&self, name: &str) -> Result<String> {
        if let Some(id) = self.collection_ids.read().await.get(name) {
            return Ok(id.clone());
        }

        let created =
            self.post("collections", &json!({ "name": name, "get_or_create": true })).await?;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Self::map_err(format!("collection '{name}' response has no id")))?
            .to_string();

        self.collection_ids.write().await.insert(name.to_string(), id.clone());
        debug!(collection = name, id = %id, "resolved chroma collection");
        Ok(id)
    }
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    ids: Vec<&'a str>,
    embeddings: Vec<Vec<f32>>,
    documents: Vec<&'a str>,
    metadatas: Vec<Value>,
}

#[derive(Serialize)]
struct QueryRequest {
    query_embeddings: Vec<Vec<f32>>,
    n_results: usize,
    include: [&'static str; 3],
}

/// Chroma answers one row per query embedding; we always send exactly one.
#[derive(Deserialize)]
struct QueryResponse {
    ids: Vec<Vec<String>>,
    #[serde(default)]
    documents: Vec<Vec<Option<String>>>,
    #[serde(default)]
    metadatas: Vec<Vec<Option<Value>>>,
    #[serde(default)]
    distances: Vec<Vec<f64>>,
}

impl QueryResponse {
    fn into_hits(self) -> Result<Vec<QueryHit>> {
        let ids = self.ids.into_iter().next().unwrap_or_default();
        let documents = self.documents.into_iter().next().unwrap_or_default();
        let metadatas = self.metadatas.into_iter().next().unwrap_or_default();
        let distances = self.distances.into_iter().next().unwrap_or_default();

        ids.into_iter()
            .enumerate()
            .map(|(i, id)| -> Result<QueryHit> {
                let metadata = metadatas.get(i).cloned().flatten().ok_or_else(|| {
                    ChromaVectorIndex::map_err(format!("record '{id}' has no metadata"))
                })?;
                let metadata: ChunkMetadata = serde_json::from_value(metadata)?;
                let distance = distances.get(i).copied().ok_or_else(|| {
                    ChromaVectorIndex::map_err(format!("record '{id}' has no distance"))
                })?;
                Ok(QueryHit {
                    document: documents.get(i).cloned().flatten().unwrap_or_default(),
                    distance,
                    metadata,
                    id,
                })
            })
            .collect()
    }
}

#[async_trait]
impl VectorIndex for ChromaVectorIndex {
    async fn ensure_collection(&self, name: &str) -> Result<()> {
        self.collection_id(name).await.map(|_| ())
    }

    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let id = self.collection_id(collection).await?;
        let documents: Vec<&str> = records.iter().map(|r| r.document.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&documents).await?;
        let metadatas = records
            .iter()
            .map(|r| serde_json::to_value(&r.metadata))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let body = UpsertRequest {
            ids: records.iter().map(|r| r.id.as_str()).collect(),
            embeddings,
            documents,
            metadatas,
        };
        self.post(&format!("collections/{id}/upsert"), &body).await?;

        debug!(collection, count = records.len(), "upserted records to chroma");
        Ok(())
    }

    async fn delete_transcript(&self, collection: &str, transcript_id: &str) -> Result<()> {
        let id = self.collection_id(collection).await?;
        self.post(
            &format!("collections/{id}/delete"),
            &json!({ "where": { "transcript_id": transcript_id } }),
        )
        .await?;
        debug!(collection, transcript_id, "deleted transcript records from chroma");
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        top_n: usize,
    ) -> Result<Vec<QueryHit>> {
        let id = self.collection_id(collection).await?;
        let embedding = self.embedder.embed(query_text).await?;

        let body = QueryRequest {
            query_embeddings: vec![embedding],
            n_results: top_n,
            include: ["documents", "metadatas", "distances"],
        };
        let raw = self.post(&format!("collections/{id}/query"), &body).await?;
        let response: QueryResponse = serde_json::from_value(raw)?;
        response.into_hits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_row_query_response() {
        let raw = json!({
            "ids": [["t1-chapter-0", "t2-chapter-1"]],
            "documents": [["Intro\nsummary\ngist", null]],
            "metadatas": [[
                {"transcript_id": "t1", "start": 0.0, "end": 30.0},
                {"transcript_id": "t2", "start": 30.0, "end": 60.0}
            ]],
            "distances": [[0.25, 0.75]]
        });
        let response: QueryResponse = serde_json::from_value(raw).unwrap();
        let hits = response.into_hits().unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.chapter_range(), Some((0.0, 30.0)));
        assert_eq!(hits[1].document, "");
        assert_eq!(hits[1].distance, 0.75);
    }

    #[test]
    fn hit_without_distance_is_rejected() {
        let raw = json!({
            "ids": [["t1-chapter-0", "t2-chapter-1"]],
            "metadatas": [[
                {"transcript_id": "t1", "start": 0.0, "end": 30.0},
                {"transcript_id": "t2", "start": 30.0, "end": 60.0}
            ]],
            "distances": [[0.25]]
        });
        let response: QueryResponse = serde_json::from_value(raw).unwrap();
        let err = response.into_hits().unwrap_err();
        assert!(matches!(err, RagError::VectorIndexError { .. }));
        assert!(err.to_string().contains("t2-chapter-1"));
    }

    #[test]
    fn paths_are_scoped_to_tenant_and_database() {
        let embedder = Arc::new(crate::embedding::LexicalEmbedder::new());
        let index = ChromaVectorIndex::new("http://chroma:8000/", embedder.clone());
        assert_eq!(
            index.url("collections"),
            "http://chroma:8000/api/v2/tenants/default_tenant/databases/default_database/\
             collections"
        );

        let index = ChromaVectorIndex::new("http://chroma:8000", embedder)
            .with_tenant("acme")
            .with_database("videos");
        assert_eq!(
            index.url("collections/c-1/query"),
            "http://chroma:8000/api/v2/tenants/acme/databases/videos/collections/c-1/query"
        );
    }

    #[test]
    fn host_without_scheme_gets_http() {
        let embedder = Arc::new(crate::embedding::LexicalEmbedder::new());
        let index = ChromaVectorIndex::from_host("chroma", 8000, embedder);
        assert_eq!(index.base_url, "http://chroma:8000");
    }
}
