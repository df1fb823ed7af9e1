//! Conversation persistence
//!
//! `SessionStorage` is the raw key/value backend. `ConversationStore` sits on
//! top of it and never fails: storage errors are logged and the caller keeps
//! working from its in-memory session.

mod migrate;
mod schema;
mod sqlite;

pub use migrate::{migrate_document, INTERRUPTED_RESULT};
pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStorage;

use crate::language::Language;
use crate::transcript::Session;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Database lock poisoned")]
    Poisoned,
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent key/value storage for sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// Identifier for this device, generated on first use and reused after
    async fn device_id(&self) -> StoreResult<String>;

    /// Raw stored document, in whatever shape it was saved
    async fn get(&self, id: &str) -> StoreResult<Option<Value>>;

    async fn put(&self, session: &Session) -> StoreResult<()>;

    async fn delete(&self, id: &str) -> StoreResult<()>;
}

#[async_trait]
impl<T: SessionStorage + ?Sized> SessionStorage for Arc<T> {
    async fn device_id(&self) -> StoreResult<String> {
        (**self).device_id().await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Value>> {
        (**self).get(id).await
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        (**self).put(session).await
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        (**self).delete(id).await
    }
}

/// Best-effort session persistence
pub struct ConversationStore<S> {
    storage: S,
}

impl<S: SessionStorage> ConversationStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The per-device session key. Falls back to a throwaway id when the
    /// backend cannot provide one.
    pub async fn session_id(&self) -> String {
        match self.storage.device_id().await {
            Ok(id) => id,
            Err(e) => {
                let id = uuid::Uuid::new_v4().to_string();
                tracing::warn!(error = %e, session_id = %id, "Device id unavailable, using ephemeral session");
                id
            }
        }
    }

    /// Load a session, migrating older shapes. Missing or unreadable storage
    /// yields a freshly seeded session.
    pub async fn load(&self, id: &str, language: Language) -> Session {
        match self.storage.get(id).await {
            Ok(Some(document)) => {
                let session = migrate_document(document, id, language, Utc::now());
                tracing::debug!(session_id = %id, turns = session.turns.len(), "Loaded session");
                session
            }
            Ok(None) => Session::seeded(id, language),
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Failed to load session, starting fresh");
                Session::seeded(id, language)
            }
        }
    }

    pub async fn save(&self, session: &Session) {
        if let Err(e) = self.storage.put(session).await {
            tracing::warn!(session_id = %session.id, error = %e, "Failed to save session");
        }
    }

    /// Erase the stored session and return a fresh seeded one
    pub async fn clear(&self, id: &str, language: Language) -> Session {
        if let Err(e) = self.storage.delete(id).await {
            tracing::warn!(session_id = %id, error = %e, "Failed to erase session");
        }
        Session::seeded(id, language)
    }
}
