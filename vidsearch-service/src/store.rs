//! Relational video store seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;
use vidsearch_rag::Transcript;

use crate::error::Result;
use crate::queue::WorkItem;

/// A transcribed video as stored in the relational store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoRecord {
    /// Row id.
    pub id: Uuid,
    /// Owning user.
    pub user_id: String,
    /// Transcription id; the lookup key for searches.
    pub transcript_id: String,
    /// Video title.
    pub title: String,
    /// The full transcript serialized as JSON.
    pub raw_transcript: String,
    /// Media URL.
    pub video_url: String,
    /// Thumbnail URL.
    pub video_thumbnail_url: String,
    /// Whether the video is publicly listed.
    pub is_public: bool,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl VideoRecord {
    /// Build the record for a freshly transcribed work item.
    pub fn from_transcript(item: &WorkItem, transcript: &Transcript) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            user_id: item.user_id.clone(),
            transcript_id: transcript.id.clone(),
            title: item.title.clone(),
            raw_transcript: serde_json::to_string(transcript)?,
            video_url: item.video_url.clone(),
            video_thumbnail_url: item.video_thumbnail_url.clone(),
            is_public: true,
            created_at: Utc::now(),
        })
    }

    /// Parse the stored transcript payload.
    ///
    /// An empty payload yields an empty transcript with this record's id.
    pub fn transcript(&self) -> Result<Transcript> {
        if self.raw_transcript.trim().is_empty() {
            return Ok(Transcript {
                id: self.transcript_id.clone(),
                user_id: self.user_id.clone(),
                text: String::new(),
                words: Vec::new(),
                chapters: Vec::new(),
            });
        }
        Ok(serde_json::from_str(&self.raw_transcript)?)
    }
}

/// Storage for [`VideoRecord`]s.
///
/// Inserts are append-only; a duplicate insert for the same transcript id is
/// stored as another row.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Insert a record.
    async fn insert(&self, record: &VideoRecord) -> Result<()>;

    /// Find the most recently inserted record for `transcript_id`.
    async fn find_by_transcript_id(&self, transcript_id: &str) -> Result<Option<VideoRecord>>;
}

/// An in-memory [`VideoStore`] for development and tests.
#[derive(Debug, Default)]
pub struct InMemoryVideoStore {
    records: RwLock<Vec<VideoRecord>>,
}

impl InMemoryVideoStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records in insertion order.
    pub async fn records(&self) -> Vec<VideoRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn insert(&self, record: &VideoRecord) -> Result<()> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn find_by_transcript_id(&self, transcript_id: &str) -> Result<Option<VideoRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().rev().find(|r| r.transcript_id == transcript_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use vidsearch_rag::Word;

    use super::*;

    fn item() -> WorkItem {
        WorkItem {
            user_id: "u1".into(),
            title: "Talk".into(),
            video_url: "https://example.com/talk.mp4".into(),
            video_thumbnail_url: "https://example.com/talk.jpg".into(),
            created_at: None,
        }
    }

    fn transcript(id: &str) -> Transcript {
        Transcript {
            id: id.into(),
            user_id: "u1".into(),
            text: "hello".into(),
            words: vec![Word::new("hello", 0.0, 0.5)],
            chapters: Vec::new(),
        }
    }

    #[test]
    fn record_round_trips_its_transcript() {
        let record = VideoRecord::from_transcript(&item(), &transcript("t1")).unwrap();
        assert!(record.is_public);
        assert_eq!(record.transcript().unwrap(), transcript("t1"));
    }

    #[tokio::test]
    async fn lookup_returns_latest_duplicate() {
        let store = InMemoryVideoStore::new();
        let first = VideoRecord::from_transcript(&item(), &transcript("t1")).unwrap();
        let mut second = first.clone();
        second.id = Uuid::new_v4();
        second.title = "Talk (again)".into();

        store.insert(&first).await.unwrap();
        store.insert(&second).await.unwrap();

        assert_eq!(store.records().await.len(), 2);
        let found = store.find_by_transcript_id("t1").await.unwrap().unwrap();
        assert_eq!(found.title, "Talk (again)");
        assert!(store.find_by_transcript_id("t9").await.unwrap().is_none());
    }
}
