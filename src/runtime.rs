//! Orchestrator runtime
//!
//! A single background task owns the session and the agent state. Callers
//! drive it through an [`OrchestratorHandle`] and observe it through a
//! snapshot watch channel plus a broadcast stream of [`UiEvent`]s.

mod executor;

#[cfg(test)]
pub(crate) mod testing;

use crate::config::{ConfigError, TriageConfig};
use crate::directory::DoctorDirectory;
use crate::host::{HostSignal, HostSignals};
use crate::language::Language;
use crate::llm::CompletionClient;
use crate::plan::PlanStep;
use crate::state_machine::{AgentPhase, Event};
use crate::store::{ConversationStore, SessionStorage};
use crate::tools::{ToolExecutor, ToolRegistry};
use crate::transcript::ConversationTurn;
use executor::Orchestrator;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};

/// Point-in-time view of the session for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: String,
    pub language: Language,
    pub phase: AgentPhase,
    pub turns: Vec<ConversationTurn>,
    pub plan: Vec<PlanStep>,
}

impl SessionSnapshot {
    pub fn is_busy(&self) -> bool {
        self.phase != AgentPhase::Idle
    }
}

/// Incremental updates for observers
#[derive(Debug, Clone)]
pub enum UiEvent {
    TurnAppended { index: usize, turn: ConversationTurn },
    TurnUpdated { index: usize, turn: ConversationTurn },
    PhaseChanged { phase: AgentPhase },
    PlanChanged { steps: Vec<PlanStep> },
    SessionReset { language: Language },
    /// The round is over and input is accepted again
    AgentDone,
    /// An intent was refused (busy, empty input)
    Rejected { reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    #[error("Orchestrator has stopped")]
    Closed,
}

/// Handle to interact with a running orchestrator
#[derive(Clone)]
pub struct OrchestratorHandle {
    event_tx: mpsc::Sender<Event>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    ui_tx: broadcast::Sender<UiEvent>,
    signals: HostSignals,
}

impl OrchestratorHandle {
    /// Submit a user utterance. Refused (as a `Rejected` event) while busy.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), OrchestratorError> {
        self.send(Event::UserSubmit { text: text.into() }).await
    }

    pub async fn clear(&self) -> Result<(), OrchestratorError> {
        self.send(Event::ClearConversation).await
    }

    /// Switch language; starts a fresh conversation in the new language
    pub async fn switch_language(&self, language: Language) -> Result<(), OrchestratorError> {
        self.send(Event::SwitchLanguage { language }).await
    }

    /// Append an agent message on behalf of the host, e.g. a booking outcome
    pub async fn post_agent_message(&self, text: impl Into<String>) -> Result<(), OrchestratorError> {
        self.send(Event::HostMessage { text: text.into() }).await
    }

    async fn send(&self, event: Event) -> Result<(), OrchestratorError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| OrchestratorError::Closed)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.ui_tx.subscribe()
    }

    /// Navigation and overlay requests raised by tools
    pub fn host_signals(&self) -> broadcast::Receiver<HostSignal> {
        self.signals.subscribe()
    }
}

/// Collaborators for one orchestrator
pub struct OrchestratorParts<C, S, T> {
    /// Language used when no stored session exists
    pub language: Language,
    pub completion: C,
    pub storage: S,
    pub tools: T,
    pub directory: Arc<dyn DoctorDirectory>,
}

/// Load (or seed) the device session and start the orchestrator task.
///
/// The task stops once every handle has been dropped and no background
/// work is still in flight.
pub async fn spawn_orchestrator<C, S, T>(parts: OrchestratorParts<C, S, T>) -> OrchestratorHandle
where
    C: CompletionClient + 'static,
    S: SessionStorage + 'static,
    T: ToolExecutor + 'static,
{
    let store = ConversationStore::new(parts.storage);
    let session_id = store.session_id().await;
    let session = store.load(&session_id, parts.language).await;
    // Write back so migrated documents are stored in the current shape
    store.save(&session).await;

    let (event_tx, event_rx) = mpsc::channel(32);
    let (ui_tx, _) = broadcast::channel(256);
    let signals = HostSignals::default();

    let orchestrator = Orchestrator::new(
        session,
        store,
        Arc::new(parts.completion),
        Arc::new(parts.tools),
        parts.directory,
        signals.clone(),
        event_rx,
        event_tx.downgrade(),
        ui_tx.clone(),
    );
    let snapshot_rx = orchestrator.subscribe_snapshots();

    tokio::spawn(orchestrator.run());

    OrchestratorHandle {
        event_tx,
        snapshot_rx,
        ui_tx,
        signals,
    }
}

/// Production wiring: Gemini completions, `SQLite` sessions, the standard tools
pub async fn start(config: &TriageConfig) -> Result<OrchestratorHandle, ConfigError> {
    let parts = OrchestratorParts {
        language: config.language,
        completion: config.completion_client()?,
        storage: config.storage()?,
        tools: ToolRegistry::standard(),
        directory: config.doctor_directory()?,
    };
    Ok(spawn_orchestrator(parts).await)
}
