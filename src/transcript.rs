//! Conversation transcript types
//!
//! A session is an ordered list of turns. The list is append-only; the one
//! permitted in-place change is resolving the most recent running tool turn.

use crate::language::Language;
use crate::plan::PlanStep;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Discriminator for a turn's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    User,
    Agent,
    AgentInternal,
    ToolExecution,
}

impl fmt::Display for TurnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnKind::User => "user",
            TurnKind::Agent => "agent",
            TurnKind::AgentInternal => "agent_internal",
            TurnKind::ToolExecution => "tool_execution",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickReplyKind {
    /// Sends `value` as the next user message
    Message,
    /// Asks the host to navigate to `value`
    Navigate,
}

/// Tappable affordance attached to a chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickReply {
    pub label: String,
    pub kind: QuickReplyKind,
    pub value: String,
}

impl QuickReply {
    pub fn message(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            label: text.clone(),
            kind: QuickReplyKind::Message,
            value: text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChatContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<QuickReply>,
}

impl ChatContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }
}

/// The model's reasoning and plan for one round
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InternalContent {
    pub thought: String,
    #[serde(default)]
    pub plan: Vec<PlanStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Running,
    Completed,
    Failed,
}

/// Which tool ran and with what parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionContent {
    pub tool: ToolInvocation,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Typed turn content, one variant per turn kind
#[derive(Debug, Clone, PartialEq)]
pub enum TurnContent {
    User(ChatContent),
    Agent(ChatContent),
    AgentInternal(InternalContent),
    ToolExecution(ToolExecutionContent),
}

impl TurnContent {
    pub fn kind(&self) -> TurnKind {
        match self {
            TurnContent::User(_) => TurnKind::User,
            TurnContent::Agent(_) => TurnKind::Agent,
            TurnContent::AgentInternal(_) => TurnKind::AgentInternal,
            TurnContent::ToolExecution(_) => TurnKind::ToolExecution,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        TurnContent::User(ChatContent::text(text))
    }

    pub fn agent(text: impl Into<String>) -> Self {
        TurnContent::Agent(ChatContent::text(text))
    }

    /// Parse content JSON for a known kind
    pub fn from_json(kind: TurnKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            TurnKind::User => TurnContent::User(serde_json::from_value(value)?),
            TurnKind::Agent => TurnContent::Agent(serde_json::from_value(value)?),
            TurnKind::AgentInternal => TurnContent::AgentInternal(serde_json::from_value(value)?),
            TurnKind::ToolExecution => TurnContent::ToolExecution(serde_json::from_value(value)?),
        })
    }

    pub fn to_json(&self) -> Value {
        let value = match self {
            TurnContent::User(c) | TurnContent::Agent(c) => serde_json::to_value(c),
            TurnContent::AgentInternal(c) => serde_json::to_value(c),
            TurnContent::ToolExecution(c) => serde_json::to_value(c),
        };
        value.unwrap_or(Value::Null)
    }

    /// Plain text of a chat turn
    pub fn text(&self) -> Option<&str> {
        match self {
            TurnContent::User(c) | TurnContent::Agent(c) => Some(&c.text),
            TurnContent::AgentInternal(_) | TurnContent::ToolExecution(_) => None,
        }
    }
}

/// One entry of the transcript.
///
/// Persisted as `{"kind", "content", "createdAt"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TurnRecord", into = "TurnRecord")]
pub struct ConversationTurn {
    pub content: TurnContent,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TurnRecord {
    kind: TurnKind,
    content: Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<TurnRecord> for ConversationTurn {
    type Error = serde_json::Error;

    fn try_from(record: TurnRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            content: TurnContent::from_json(record.kind, record.content)?,
            created_at: record.created_at,
        })
    }
}

impl From<ConversationTurn> for TurnRecord {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            kind: turn.content.kind(),
            content: turn.content.to_json(),
            created_at: turn.created_at,
        }
    }
}

impl ConversationTurn {
    pub fn new(content: TurnContent) -> Self {
        Self {
            content,
            created_at: Utc::now(),
        }
    }

    pub fn kind(&self) -> TurnKind {
        self.content.kind()
    }

    /// The seeded greeting for a language
    pub fn welcome(language: Language) -> Self {
        let profile = language.profile();
        Self::new(TurnContent::Agent(ChatContent {
            text: profile.welcome.to_string(),
            actions: profile
                .welcome_replies
                .iter()
                .map(|r| QuickReply::message(*r))
                .collect(),
        }))
    }

    pub fn as_tool_execution(&self) -> Option<&ToolExecutionContent> {
        match &self.content {
            TurnContent::ToolExecution(t) => Some(t),
            _ => None,
        }
    }
}

/// A conversation: one per device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub language: Language,
    pub turns: Vec<ConversationTurn>,
}

impl Session {
    /// A fresh session holding only the welcome turn
    pub fn seeded(id: impl Into<String>, language: Language) -> Self {
        Self {
            id: id.into(),
            language,
            turns: vec![ConversationTurn::welcome(language)],
        }
    }

    /// Append a turn, returning its index
    pub fn push(&mut self, turn: ConversationTurn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// Resolve the most recently appended tool turn, if it is still running.
    ///
    /// Returns the index of the updated turn. Earlier tool turns are never
    /// touched, and a turn that already finished stays as it is.
    pub fn resolve_running_tool(&mut self, status: ToolStatus, result: impl Into<String>) -> Option<usize> {
        let index = self
            .turns
            .iter()
            .rposition(|t| t.kind() == TurnKind::ToolExecution)?;
        let TurnContent::ToolExecution(tool) = &mut self.turns[index].content else {
            return None;
        };
        if tool.status != ToolStatus::Running || status == ToolStatus::Running {
            return None;
        }
        tool.status = status;
        tool.result = Some(result.into());
        Some(index)
    }

    pub fn running_tool_count(&self) -> usize {
        self.turns
            .iter()
            .filter_map(ConversationTurn::as_tool_execution)
            .filter(|t| t.status == ToolStatus::Running)
            .count()
    }

    pub fn kinds(&self) -> Vec<TurnKind> {
        self.turns.iter().map(ConversationTurn::kind).collect()
    }
}
