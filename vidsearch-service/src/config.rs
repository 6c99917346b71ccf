//! Service configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use vidsearch_rag::RagConfig;

use crate::error::{Result, ServiceError};

/// Default location of the pending work-item CSV.
pub const DEFAULT_CSV_PATH: &str = "./data/videos.csv";

/// Default number of deliveries per work item before it is given up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const DEFAULT_CHROMA_HOST: &str = "localhost";
const DEFAULT_CHROMA_PORT: u16 = 8000;
const DEFAULT_CHROMA_TENANT: &str = "default_tenant";
const DEFAULT_CHROMA_DATABASE: &str = "default_database";

/// Configuration for the ingestion worker and the search service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    /// AssemblyAI API key (`ASSEMBLYAI_API_KEY`).
    pub assemblyai_api_key: Option<String>,
    /// OpenAI API key for embeddings (`OPENAI_API_KEY`).
    pub openai_api_key: Option<String>,
    /// Chroma host or URL (`CHROMADB_URL`).
    pub chroma_host: String,
    /// Chroma port (`CHROMADB_PORT`).
    pub chroma_port: u16,
    /// Chroma tenant (`CHROMADB_TENANT`).
    pub chroma_tenant: String,
    /// Chroma database (`CHROMADB_DATABASE`).
    pub chroma_database: String,
    /// PostgreSQL connection string (`DATABASE_URL`).
    pub database_url: Option<String>,
    /// CSV of pending work items (`VIDSEARCH_CSV_PATH`).
    pub csv_path: PathBuf,
    /// Deliveries per work item (`VIDSEARCH_MAX_ATTEMPTS`).
    pub max_attempts: u32,
    /// Upper bound on one transcription (`VIDSEARCH_TRANSCRIBE_TIMEOUT_SECS`).
    pub transcribe_timeout: Option<Duration>,
    /// Indexing and retrieval parameters.
    pub rag: RagConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            assemblyai_api_key: None,
            openai_api_key: None,
            chroma_host: DEFAULT_CHROMA_HOST.to_string(),
            chroma_port: DEFAULT_CHROMA_PORT,
            chroma_tenant: DEFAULT_CHROMA_TENANT.to_string(),
            chroma_database: DEFAULT_CHROMA_DATABASE.to_string(),
            database_url: None,
            csv_path: PathBuf::from(DEFAULT_CSV_PATH),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            transcribe_timeout: None,
            rag: RagConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::ConfigError`] if a numeric variable does not
    /// parse or `VIDSEARCH_MAX_ATTEMPTS` is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let chroma_port = match get("CHROMADB_PORT") {
            Some(raw) => parse_number("CHROMADB_PORT", &raw)?,
            None => defaults.chroma_port,
        };
        let max_attempts = match get("VIDSEARCH_MAX_ATTEMPTS") {
            Some(raw) => parse_number("VIDSEARCH_MAX_ATTEMPTS", &raw)?,
            None => defaults.max_attempts,
        };
        if max_attempts == 0 {
            return Err(ServiceError::ConfigError(
                "VIDSEARCH_MAX_ATTEMPTS must be greater than zero".to_string(),
            ));
        }
        let transcribe_timeout = get("VIDSEARCH_TRANSCRIBE_TIMEOUT_SECS")
            .map(|raw| parse_number("VIDSEARCH_TRANSCRIBE_TIMEOUT_SECS", &raw))
            .transpose()?
            .map(Duration::from_secs);

        Ok(Self {
            assemblyai_api_key: get("ASSEMBLYAI_API_KEY"),
            openai_api_key: get("OPENAI_API_KEY"),
            chroma_host: get("CHROMADB_URL").unwrap_or(defaults.chroma_host),
            chroma_port,
            chroma_tenant: get("CHROMADB_TENANT").unwrap_or(defaults.chroma_tenant),
            chroma_database: get("CHROMADB_DATABASE").unwrap_or(defaults.chroma_database),
            database_url: get("DATABASE_URL"),
            csv_path: get("VIDSEARCH_CSV_PATH").map(PathBuf::from).unwrap_or(defaults.csv_path),
            max_attempts,
            transcribe_timeout,
            rag: defaults.rag,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| ServiceError::ConfigError(format!("{key} must be a number, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn reads_deployment_variables() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("ASSEMBLYAI_API_KEY", "aai"),
            ("CHROMADB_URL", "chroma"),
            ("CHROMADB_PORT", "9000"),
            ("VIDSEARCH_TRANSCRIBE_TIMEOUT_SECS", "600"),
            ("OPENAI_API_KEY", "  "),
        ]))
        .unwrap();
        assert_eq!(config.assemblyai_api_key.as_deref(), Some("aai"));
        assert_eq!(config.chroma_host, "chroma");
        assert_eq!(config.chroma_port, 9000);
        assert_eq!(config.transcribe_timeout, Some(Duration::from_secs(600)));
        assert_eq!(config.openai_api_key, None);
        assert_eq!(config.chroma_tenant, "default_tenant");
        assert_eq!(config.chroma_database, "default_database");
    }

    #[test]
    fn chroma_tenant_and_database_are_configurable() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("CHROMADB_TENANT", "acme"),
            ("CHROMADB_DATABASE", "videos"),
        ]))
        .unwrap();
        assert_eq!(config.chroma_tenant, "acme");
        assert_eq!(config.chroma_database, "videos");
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = ServiceConfig::from_lookup(lookup(&[("CHROMADB_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("CHROMADB_PORT"));
        let err =
            ServiceConfig::from_lookup(lookup(&[("VIDSEARCH_MAX_ATTEMPTS", "0")])).unwrap_err();
        assert!(matches!(err, ServiceError::ConfigError(_)));
    }
}
