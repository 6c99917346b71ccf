//! Turning chunk and query text into vectors.

use async_trait::async_trait;

use crate::error::Result;

/// Maps text to a fixed-size vector so the index can compare chunks with queries.
///
/// Chunks and queries must go through the same provider. Override
/// [`embed_batch`](EmbeddingProvider::embed_batch) when the backend can embed
/// many chunks in one call; the fallback embeds them one at a time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed `texts`, returning vectors in the same order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimensions(&self) -> usize;
}

/// Default dimensionality of [`LexicalEmbedder`].
const DEFAULT_LEXICAL_DIMENSIONS: usize = 256;

/// An offline embedder that hashes lowercased word tokens into a fixed number
/// of buckets and L2-normalizes the counts.
///
/// Texts sharing vocabulary land close together under cosine distance, which
/// is enough for local runs and tests without a network provider.
#[derive(Debug, Clone, Copy)]
pub struct LexicalEmbedder {
    dimensions: usize,
}

impl LexicalEmbedder {
    /// Create an embedder with the default dimensionality.
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_LEXICAL_DIMENSIONS)
    }

    /// Create an embedder with a custom dimensionality (at least 1).
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self { dimensions: dimensions.max(1) }
    }

    fn bucket(&self, token: &str) -> usize {
        // FNV-1a, stable across platforms and releases.
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in token.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimensions as u64) as usize
    }
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for LexicalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            vector[self.bucket(&token.to_lowercase())] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lexical_embedding_is_case_insensitive_and_normalized() {
        let embedder = LexicalEmbedder::with_dimensions(32);
        let a = embedder.embed("Rust Ownership").await.unwrap();
        let b = embedder.embed("rust ownership").await.unwrap();
        assert_eq!(a, b);
        let norm = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn blank_text_embeds_to_zero_vector() {
        let embedder = LexicalEmbedder::with_dimensions(8);
        let v = embedder.embed("   ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(embedder.dimensions(), 8);
    }
}
