//! Migration of stored session documents
//!
//! Older builds saved a bare array of turns, used `type`/`role` instead of
//! `kind`, stored plans as plain strings and sometimes omitted timestamps.
//! Everything is normalised here into the current turn shape. A turn that
//! cannot be understood is dropped rather than failing the whole load.

use crate::language::Language;
use crate::plan::{PlanStatus, PlanStep};
use crate::transcript::{
    ChatContent, ConversationTurn, InternalContent, QuickReply, QuickReplyKind, Session,
    ToolExecutionContent, ToolInvocation, ToolStatus, TurnContent, TurnKind,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// Result recorded on a tool turn that was still running when saved
pub const INTERRUPTED_RESULT: &str = "Interrupted before completion";

/// Normalise a stored document into a session.
///
/// `now` stamps turns that carry no usable timestamp. A session with no
/// surviving turns is reseeded with the welcome turn.
pub fn migrate_document(
    document: Value,
    id: &str,
    fallback_language: Language,
    now: DateTime<Utc>,
) -> Session {
    let (language, raw_turns) = match document {
        Value::Array(turns) => (fallback_language, turns),
        Value::Object(mut obj) => {
            let language = obj
                .get("language")
                .and_then(Value::as_str)
                .and_then(Language::from_code)
                .unwrap_or(fallback_language);
            let turns = match obj.remove("turns").or_else(|| obj.remove("messages")) {
                Some(Value::Array(turns)) => turns,
                _ => Vec::new(),
            };
            (language, turns)
        }
        other => {
            tracing::warn!(session_id = %id, kind = %value_kind(&other), "Unrecognised session document");
            (fallback_language, Vec::new())
        }
    };

    let total = raw_turns.len();
    let turns: Vec<ConversationTurn> = raw_turns
        .into_iter()
        .filter_map(|raw| migrate_turn(raw, now))
        .collect();
    if turns.len() < total {
        tracing::warn!(
            session_id = %id,
            dropped = total - turns.len(),
            "Dropped unreadable turns while loading session"
        );
    }

    if turns.is_empty() {
        return Session::seeded(id, language);
    }
    Session {
        id: id.to_string(),
        language,
        turns,
    }
}

/// Normalise a single stored turn
pub fn migrate_turn(raw: Value, now: DateTime<Utc>) -> Option<ConversationTurn> {
    let Value::Object(mut obj) = raw else {
        return None;
    };

    let kind = ["kind", "type", "role"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .and_then(parse_kind)?;
    let created_at = take_timestamp(&mut obj).unwrap_or(now);
    let content = obj.remove("content").unwrap_or(Value::Null);

    let content = match kind {
        TurnKind::User => TurnContent::User(chat_content(content, &obj)?),
        TurnKind::Agent => TurnContent::Agent(chat_content(content, &obj)?),
        TurnKind::AgentInternal => TurnContent::AgentInternal(internal_content(content, &obj)),
        TurnKind::ToolExecution => TurnContent::ToolExecution(tool_content(content, &obj)?),
    };
    Some(ConversationTurn { content, created_at })
}

fn parse_kind(s: &str) -> Option<TurnKind> {
    match s.to_ascii_lowercase().as_str() {
        "user" | "human" => Some(TurnKind::User),
        "agent" | "bot" | "assistant" | "model" => Some(TurnKind::Agent),
        "agent_internal" | "agent-internal" | "internal" | "thought" | "agent_thought" => {
            Some(TurnKind::AgentInternal)
        }
        "tool_execution" | "tool-execution" | "tool" | "tool_call" => Some(TurnKind::ToolExecution),
        _ => None,
    }
}

fn take_timestamp(obj: &mut Map<String, Value>) -> Option<DateTime<Utc>> {
    ["createdAt", "created_at", "timestamp"]
        .iter()
        .find_map(|key| obj.remove(*key).and_then(|v| parse_timestamp(&v)))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn chat_content(content: Value, turn: &Map<String, Value>) -> Option<ChatContent> {
    match content {
        Value::String(text) => Some(ChatContent::text(text)),
        Value::Object(obj) => {
            let text = string_field(&obj, &["text", "message"])?;
            let actions = obj
                .get("actions")
                .or_else(|| turn.get("actions"))
                .map(quick_replies)
                .unwrap_or_default();
            Some(ChatContent { text, actions })
        }
        // Oldest shape kept the text beside the discriminator
        _ => string_field(turn, &["text", "message"]).map(|text| ChatContent {
            text,
            actions: turn.get("actions").map(quick_replies).unwrap_or_default(),
        }),
    }
}

fn quick_replies(value: &Value) -> Vec<QuickReply> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(QuickReply::message(s.clone())),
            Value::Object(obj) => {
                let label = string_field(obj, &["label", "text"])?;
                let value = string_field(obj, &["value"]).unwrap_or_else(|| label.clone());
                let kind = match obj.get("kind").or_else(|| obj.get("type")).and_then(Value::as_str) {
                    Some("navigate" | "link") => QuickReplyKind::Navigate,
                    _ => QuickReplyKind::Message,
                };
                Some(QuickReply { label, kind, value })
            }
            _ => None,
        })
        .collect()
}

fn internal_content(content: Value, turn: &Map<String, Value>) -> InternalContent {
    let (thought, plan) = match &content {
        Value::Object(obj) => (
            string_field(obj, &["thought", "text"]),
            obj.get("plan").or_else(|| obj.get("steps")),
        ),
        Value::String(s) => (Some(s.clone()), turn.get("plan")),
        _ => (string_field(turn, &["thought"]), turn.get("plan")),
    };
    InternalContent {
        thought: thought.unwrap_or_default(),
        plan: plan.map(plan_steps).unwrap_or_default(),
    }
}

fn plan_steps(value: &Value) -> Vec<PlanStep> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(PlanStep::pending(s.clone())),
            Value::Object(obj) => {
                let text = string_field(obj, &["text", "step", "description"])?;
                let status = match obj.get("status").and_then(Value::as_str) {
                    Some("active" | "in_progress") => PlanStatus::Active,
                    Some("completed" | "done") => PlanStatus::Completed,
                    _ => PlanStatus::Pending,
                };
                Some(PlanStep { text, status })
            }
            _ => None,
        })
        .collect()
}

fn tool_content(content: Value, turn: &Map<String, Value>) -> Option<ToolExecutionContent> {
    let obj = match content {
        Value::Object(obj) => obj,
        _ => turn.clone(),
    };

    let tool = match obj.get("tool") {
        Some(Value::Object(tool)) => {
            let name = string_field(tool, &["name"])?;
            ToolInvocation {
                label: string_field(tool, &["label"]).unwrap_or_else(|| name.clone()),
                params: tool.get("params").cloned().unwrap_or_else(|| Value::Object(Map::new())),
                name,
            }
        }
        Some(Value::String(name)) => ToolInvocation {
            name: name.clone(),
            label: string_field(&obj, &["label"]).unwrap_or_else(|| name.clone()),
            params: obj.get("params").cloned().unwrap_or_else(|| Value::Object(Map::new())),
        },
        _ => return None,
    };

    let result = string_field(&obj, &["result", "output"]);
    let (status, result) = match obj.get("status").and_then(Value::as_str) {
        Some("completed" | "complete" | "success" | "done") => (ToolStatus::Completed, result),
        Some("failed" | "error") => (ToolStatus::Failed, result),
        // A reload cannot resume a tool that was mid-flight
        _ => (ToolStatus::Failed, Some(result.unwrap_or_else(|| INTERRUPTED_RESULT.to_string()))),
    };

    Some(ToolExecutionContent { tool, status, result })
}

fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
