//! At-least-once work queue feeding the ingestion worker.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{Result, ServiceError};

/// One media source awaiting transcription and indexing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkItem {
    /// Owning user.
    pub user_id: String,
    /// Video title.
    pub title: String,
    /// Media URL handed to the transcription engine.
    pub video_url: String,
    /// Thumbnail URL.
    pub video_thumbnail_url: String,
    /// Creation timestamp as given by the source, if any.
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// A work item together with how many times it has been delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The item.
    pub item: WorkItem,
    /// 1 on first delivery.
    pub attempt: u32,
}

impl Delivery {
    fn retry(self) -> Self {
        Self { item: self.item, attempt: self.attempt + 1 }
    }
}

/// Sending half of the work queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<Delivery>,
}

/// Receiving half of the work queue, owned by the single worker.
///
/// Redelivered items are served before newly enqueued ones.
#[derive(Debug)]
pub struct WorkReceiver {
    rx: mpsc::UnboundedReceiver<Delivery>,
    redelivered: VecDeque<Delivery>,
}

/// Create a connected queue pair.
pub fn work_queue() -> (WorkQueue, WorkReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (WorkQueue { tx }, WorkReceiver { rx, redelivered: VecDeque::new() })
}

impl WorkQueue {
    /// Enqueue an item for its first delivery.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::QueueError`] if the receiver was dropped.
    pub fn enqueue(&self, item: WorkItem) -> Result<()> {
        self.tx
            .send(Delivery { item, attempt: 1 })
            .map_err(|e| {
                ServiceError::QueueError(format!("worker is gone, dropped '{}'", e.0.item.title))
            })
    }
}

impl WorkReceiver {
    /// Wait for the next delivery. Returns `None` once every [`WorkQueue`]
    /// handle is dropped and nothing is left to deliver.
    pub async fn recv(&mut self) -> Option<Delivery> {
        if let Some(delivery) = self.redelivered.pop_front() {
            return Some(delivery);
        }
        self.rx.recv().await
    }

    /// Take the next delivery if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.redelivered.pop_front().or_else(|| self.rx.try_recv().ok())
    }

    /// Schedule `delivery` to be handed out again with its attempt counter bumped.
    pub fn redeliver(&mut self, delivery: Delivery) {
        self.redelivered.push_back(delivery.retry());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str) -> WorkItem {
        WorkItem {
            user_id: "u1".into(),
            title: title.into(),
            video_url: format!("https://example.com/{title}.mp4"),
            video_thumbnail_url: String::new(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn redelivered_items_come_first_with_bumped_attempt() {
        let (queue, mut receiver) = work_queue();
        queue.enqueue(item("a")).unwrap();
        queue.enqueue(item("b")).unwrap();

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.attempt, 1);
        receiver.redeliver(first);

        let again = receiver.recv().await.unwrap();
        assert_eq!(again.item.title, "a");
        assert_eq!(again.attempt, 2);
        assert_eq!(receiver.recv().await.unwrap().item.title, "b");
    }

    #[tokio::test]
    async fn closes_after_senders_drop() {
        let (queue, mut receiver) = work_queue();
        queue.enqueue(item("a")).unwrap();
        drop(queue);
        assert!(receiver.recv().await.is_some());
        assert!(receiver.recv().await.is_none());
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn enqueue_fails_without_receiver() {
        let (queue, receiver) = work_queue();
        drop(receiver);
        assert!(matches!(queue.enqueue(item("a")), Err(ServiceError::QueueError(_))));
    }
}
