//! Agent state types

use crate::interpreter::ModelReply;
use crate::language::Language;
use crate::tools::ToolInput;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A declared action resolved against the tool registry
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Round-local identifier, used to match completions to calls
    pub id: String,
    pub input: ToolInput,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, input: ToolInput) -> Self {
        Self {
            id: id.into(),
            input,
        }
    }

    pub fn name(&self) -> &str {
        self.input.name()
    }
}

/// Session-wide agent state. Busy states carry what the round still needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AgentState {
    /// Ready for user input
    #[default]
    Idle,

    /// Waiting on the completion service
    Thinking,

    /// Reply interpreted; recording the plan
    Planning { reply: ModelReply },

    /// Running declared tools one at a time
    Executing {
        current: ToolCall,
        remaining: Vec<ToolCall>,
        response: String,
    },

    /// Appending the final response
    Responding { response: String },
}

impl AgentState {
    pub fn phase(&self) -> AgentPhase {
        match self {
            AgentState::Idle => AgentPhase::Idle,
            AgentState::Thinking => AgentPhase::Thinking,
            AgentState::Planning { .. } => AgentPhase::Planning,
            AgentState::Executing { .. } => AgentPhase::Executing,
            AgentState::Responding { .. } => AgentPhase::Responding,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, AgentState::Idle)
    }
}

/// Plain state label for observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Idle,
    Thinking,
    Planning,
    Executing,
    Responding,
}

impl fmt::Display for AgentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentPhase::Idle => "idle",
            AgentPhase::Thinking => "thinking",
            AgentPhase::Planning => "planning",
            AgentPhase::Executing => "executing",
            AgentPhase::Responding => "responding",
        };
        f.write_str(s)
    }
}

/// Immutable context for transitions
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub session_id: String,
    pub language: Language,
}

impl TurnContext {
    pub fn new(session_id: impl Into<String>, language: Language) -> Self {
        Self {
            session_id: session_id.into(),
            language,
        }
    }
}
