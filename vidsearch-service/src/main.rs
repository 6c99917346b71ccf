//! # vidsearch CLI
//!
//! - `vidsearch ingest [--csv PATH]` transcribes, stores, and indexes every
//!   video listed in the CSV, then prints a per-item summary.
//! - `vidsearch search <TERM>` prints the search response as JSON.
//!
//! Configuration comes from the environment (a `.env` file is honored):
//! `ASSEMBLYAI_API_KEY`, `OPENAI_API_KEY`, `CHROMADB_URL`, `CHROMADB_PORT`,
//! `CHROMADB_TENANT`, `CHROMADB_DATABASE`, `DATABASE_URL`, `VIDSEARCH_CSV_PATH`,
//! `VIDSEARCH_MAX_ATTEMPTS`, `VIDSEARCH_TRANSCRIBE_TIMEOUT_SECS`.
//! Set `RUST_LOG` to adjust logging.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use vidsearch_rag::{ChromaVectorIndex, Indexer, OpenAIEmbeddingProvider, Retriever, VectorIndex};
use vidsearch_service::{
    AssemblyAiEngine, Orchestrator, PgVideoStore, SearchService, ServiceConfig, VideoStore,
    ingest_batch, work_queue,
};

#[derive(Parser)]
#[command(name = "vidsearch")]
#[command(about = "Transcribe videos and search them by meaning")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcribe and index every video listed in a CSV file
    Ingest {
        /// CSV of pending videos (default: VIDSEARCH_CSV_PATH or ./data/videos.csv)
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Search indexed transcripts
    Search {
        /// Search term
        term: String,
    },
}

struct Backends {
    index: Arc<dyn VectorIndex>,
    store: Arc<dyn VideoStore>,
}

async fn connect(config: &ServiceConfig) -> Result<Backends> {
    let openai_key = config.openai_api_key.clone().context("OPENAI_API_KEY is not set")?;
    let embedder = Arc::new(OpenAIEmbeddingProvider::new(openai_key)?);
    let index = Arc::new(
        ChromaVectorIndex::from_host(&config.chroma_host, config.chroma_port, embedder)
            .with_tenant(&config.chroma_tenant)
            .with_database(&config.chroma_database),
    );

    let database_url = config.database_url.as_deref().context("DATABASE_URL is not set")?;
    let store = PgVideoStore::connect(database_url).await?;
    store.migrate().await?;

    Ok(Backends { index, store: Arc::new(store) })
}

async fn ingest(config: ServiceConfig, csv: Option<PathBuf>) -> Result<()> {
    let backends = connect(&config).await?;
    let api_key = config.assemblyai_api_key.clone().context("ASSEMBLYAI_API_KEY is not set")?;
    let engine = Arc::new(AssemblyAiEngine::new(api_key)?);

    let indexer = Indexer::new(backends.index, config.rag.clone());
    indexer.ensure_collections().await?;

    let orchestrator = Orchestrator::new(engine, backends.store, Arc::new(indexer))
        .with_transcribe_timeout(config.transcribe_timeout)
        .with_max_attempts(config.max_attempts);

    let path = csv.unwrap_or(config.csv_path);
    let (queue, mut receiver) = work_queue();
    let queued = ingest_batch(&path, &queue)
        .await
        .with_context(|| format!("failed to queue work items from {}", path.display()))?;
    drop(queue);
    info!(queued, "starting ingestion");

    let summary = orchestrator.run(&mut receiver).await;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    if summary.failed() > 0 {
        anyhow::bail!("{} of {} items failed", summary.failed(), summary.outcomes.len());
    }
    Ok(())
}

async fn search(config: ServiceConfig, term: &str) -> Result<()> {
    let backends = connect(&config).await?;
    let retriever = Retriever::new(backends.index, config.rag.clone());
    let service = SearchService::new(Arc::new(retriever), backends.store);

    let payload = service.search(term).await;
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ServiceConfig::from_env()?;

    match cli.command {
        Commands::Ingest { csv } => ingest(config, csv).await,
        Commands::Search { term } => search(config, &term).await,
    }
}
