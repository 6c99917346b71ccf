//! Transcription ingestion and search for vidsearch.
//!
//! Work items (media URL, owner, title, thumbnail) flow from a CSV batch
//! source through an at-least-once queue into the [`Orchestrator`], which
//! transcribes each item and then stores and indexes it. The
//! [`SearchService`] answers queries from the vector index and the relational
//! store.
//!
//! Backends: AssemblyAI transcription behind the `assemblyai` feature,
//! PostgreSQL storage behind the `postgres` feature. The `cli` feature builds
//! the `vidsearch` binary.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod search;
pub mod source;
pub mod store;
pub mod transcription;

#[cfg(feature = "assemblyai")]
pub mod assemblyai;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};
pub use orchestrator::{BatchSummary, Failed, Indexed, ItemOutcome, ItemState, Orchestrator};
pub use queue::{Delivery, WorkItem, WorkQueue, WorkReceiver, work_queue};
pub use search::{SearchPayload, SearchResult, SearchService};
pub use source::{ingest_batch, parse_work_items, read_work_items};
pub use store::{InMemoryVideoStore, VideoRecord, VideoStore};
pub use transcription::{
    TranscriptionEngine, TranscriptionOutcome, TranscriptionResponse, TranscriptionStatus,
};

#[cfg(feature = "assemblyai")]
pub use assemblyai::AssemblyAiEngine;
#[cfg(feature = "postgres")]
pub use postgres::PgVideoStore;
