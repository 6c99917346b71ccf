//! Records exchanged with the vector index.
//!
//! Chunk metadata is typed per chunk kind but serializes to the flat
//! key/value object the index stores, e.g.
//! `{"transcript_id": "t1", "start": 0.0, "end": 42.0}`.

use serde::{Deserialize, Serialize};

/// Metadata attached to a transcript-level chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptChunkMeta {
    /// The transcript this chunk belongs to.
    pub transcript_id: String,
    /// Owning user of the transcript.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Position of the chunk; only present when the transcript was split.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

/// Metadata attached to a chapter-level chunk.
///
/// Every sub-chunk of one chapter carries the chapter's own `start`/`end`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterChunkMeta {
    /// The transcript owning the chapter.
    pub transcript_id: String,
    /// Chapter start in seconds.
    pub start: f64,
    /// Chapter end in seconds.
    pub end: f64,
}

/// Metadata for either kind of chunk.
///
/// Untagged so the wire shape stays a flat object. `Chapter` is tried first
/// because it is the only variant with required `start`/`end` keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChunkMetadata {
    /// Chapter-level chunk metadata.
    Chapter(ChapterChunkMeta),
    /// Transcript-level chunk metadata.
    Transcript(TranscriptChunkMeta),
}

impl ChunkMetadata {
    /// The transcript id shared by both metadata kinds.
    pub fn transcript_id(&self) -> &str {
        match self {
            Self::Chapter(meta) => &meta.transcript_id,
            Self::Transcript(meta) => &meta.transcript_id,
        }
    }

    /// The chapter time range, if this is chapter metadata.
    pub fn chapter_range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Chapter(meta) => Some((meta.start, meta.end)),
            Self::Transcript(_) => None,
        }
    }
}

impl From<TranscriptChunkMeta> for ChunkMetadata {
    fn from(meta: TranscriptChunkMeta) -> Self {
        Self::Transcript(meta)
    }
}

impl From<ChapterChunkMeta> for ChunkMetadata {
    fn from(meta: ChapterChunkMeta) -> Self {
        Self::Chapter(meta)
    }
}

/// A chunk of text to upsert into a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexRecord {
    /// Record id; re-upserting an id replaces the record.
    pub id: String,
    /// The chunk text.
    pub document: String,
    /// Typed metadata.
    pub metadata: ChunkMetadata,
}

/// A nearest-neighbour match returned by a collection query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryHit {
    /// Record id.
    pub id: String,
    /// The stored chunk text.
    pub document: String,
    /// The stored metadata.
    pub metadata: ChunkMetadata,
    /// Raw distance to the query; lower is closer.
    pub distance: f64,
}
