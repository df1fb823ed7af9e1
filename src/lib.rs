//! Triage agent - conversational health-triage orchestration
//!
//! Turns a user's utterance into a completion request, interprets the reply
//! into a plan, runs the declared tools one at a time and keeps a durable
//! transcript of the whole exchange.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod directory;
pub mod host;
pub mod interpreter;
pub mod language;
pub mod llm;
pub mod plan;
pub mod prompt;
pub mod runtime;
pub mod state_machine;
pub mod store;
pub mod telemetry;
pub mod tools;
pub mod transcript;
pub mod voice;

pub use config::{ConfigError, TriageConfig};
pub use language::{Language, LanguageProfile};
pub use runtime::{
    spawn_orchestrator, start, OrchestratorError, OrchestratorHandle, OrchestratorParts,
    SessionSnapshot, UiEvent,
};
pub use state_machine::AgentPhase;
pub use transcript::{ConversationTurn, Session, TurnContent, TurnKind};
