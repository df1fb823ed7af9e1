//! Environment configuration

use crate::directory::{DirectoryError, DoctorDirectory, HttpDoctorDirectory, UnconfiguredDirectory};
use crate::language::Language;
use crate::llm::{GeminiClient, LlmError, LoggingClient};
use crate::store::{SqliteStorage, StoreError};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set and no LLM_GATEWAY is configured")]
    MissingApiKey,
    #[error("Failed to build completion client: {0}")]
    Llm(#[from] LlmError),
    #[error("Failed to build doctor directory client: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Failed to open session database: {0}")]
    Store(#[from] StoreError),
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct TriageConfig {
    pub gemini_api_key: Option<String>,
    /// LLM gateway URL; when set the gateway supplies credentials
    pub gateway: Option<String>,
    pub model: String,
    pub db_path: PathBuf,
    pub directory_url: Option<String>,
    pub language: Language,
    pub log_json: bool,
}

impl TriageConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = non_empty("TRIAGE_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(format!("{home}/.triage-agent/triage.db"))
            },
            PathBuf::from,
        );

        let language = match non_empty("TRIAGE_LANGUAGE") {
            Some(code) => Language::from_code(&code).unwrap_or_else(|| {
                tracing::warn!(code = %code, "Unsupported TRIAGE_LANGUAGE, using English");
                Language::En
            }),
            None => Language::En,
        };

        Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gateway: non_empty("LLM_GATEWAY"),
            model: non_empty("TRIAGE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            db_path,
            directory_url: non_empty("DOCTOR_DIRECTORY_URL"),
            language,
            log_json: non_empty("TRIAGE_LOG_JSON")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }

    /// Logging-wrapped Gemini client
    pub fn completion_client(&self) -> Result<LoggingClient, ConfigError> {
        if self.gateway.is_none() && self.gemini_api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }
        let client = GeminiClient::new(
            self.gemini_api_key.clone(),
            &self.model,
            self.gateway.as_deref(),
        )?;
        Ok(LoggingClient::new(Arc::new(client)))
    }

    pub fn storage(&self) -> Result<SqliteStorage, ConfigError> {
        tracing::info!(path = %self.db_path.display(), "Opening session database");
        Ok(SqliteStorage::open(&self.db_path)?)
    }

    /// Directory client, or one that reports itself unconfigured
    pub fn doctor_directory(&self) -> Result<Arc<dyn DoctorDirectory>, ConfigError> {
        Ok(match &self.directory_url {
            Some(url) => Arc::new(HttpDoctorDirectory::new(url)?),
            None => {
                tracing::warn!("DOCTOR_DIRECTORY_URL not set, specialist search will fail");
                Arc::new(UnconfiguredDirectory)
            }
        })
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
