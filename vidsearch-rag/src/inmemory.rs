//! In-memory vector index using cosine distance.
//!
//! This module provides [`InMemoryVectorIndex`], a vector index backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. Documents are embedded with
//! the configured [`EmbeddingProvider`]. It is suitable for development,
//! testing, and small-scale use cases.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::record::{IndexRecord, QueryHit};
use crate::vectorindex::VectorIndex;

const BACKEND: &str = "InMemory";

#[derive(Debug, Clone)]
struct StoredRecord {
    record: IndexRecord,
    embedding: Vec<f32>,
}

/// An in-memory vector index using cosine distance for queries.
///
/// Collections are stored as nested `HashMap`s: collection name → record ID → record.
pub struct InMemoryVectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    collections: RwLock<HashMap<String, HashMap<String, StoredRecord>>>,
}

impl InMemoryVectorIndex {
    /// Create a new empty index that embeds text with `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder, collections: RwLock::new(HashMap::new()) }
    }

    /// Return all records of a collection, sorted by id.
    pub async fn records(&self, collection: &str) -> Result<Vec<IndexRecord>> {
        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;
        let mut records: Vec<IndexRecord> =
            store.values().map(|stored| stored.record.clone()).collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }
}

fn missing(collection: &str) -> RagError {
    RagError::VectorIndexError {
        backend: BACKEND.to_string(),
        message: format!("collection '{collection}' does not exist"),
    }
}

/// Compute cosine distance (`1 - cosine similarity`) between two vectors.
///
/// Returns 1.0 if either vector has zero magnitude.
fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - f64::from(dot / (norm_a * norm_b))
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn ensure_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn upsert(&self, collection: &str, records: &[IndexRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // Embed before taking the write lock.
        let texts: Vec<&str> = records.iter().map(|r| r.document.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        for (record, embedding) in records.iter().zip(embeddings) {
            store.insert(record.id.clone(), StoredRecord { record: record.clone(), embedding });
        }
        debug!(collection, count = records.len(), "upserted records in memory");
        Ok(())
    }

    async fn delete_transcript(&self, collection: &str, transcript_id: &str) -> Result<()> {
        let mut collections = self.collections.write().await;
        let store = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        store.retain(|_, stored| stored.record.metadata.transcript_id() != transcript_id);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query_text: &str,
        top_n: usize,
    ) -> Result<Vec<QueryHit>> {
        let query_embedding = self.embedder.embed(query_text).await?;

        let collections = self.collections.read().await;
        let store = collections.get(collection).ok_or_else(|| missing(collection))?;

        let mut hits: Vec<QueryHit> = store
            .values()
            .map(|stored| QueryHit {
                id: stored.record.id.clone(),
                document: stored.record.document.clone(),
                metadata: stored.record.metadata.clone(),
                distance: cosine_distance(&stored.embedding, &query_embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_n);
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let d = cosine_distance(&[1.0, 2.0], &[1.0, 2.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn zero_vector_is_maximally_distant() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }
}
