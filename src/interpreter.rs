//! Response interpretation
//!
//! The model is asked for a JSON object but replies arrive wrapped in prose,
//! fenced in markdown, truncated, or not as JSON at all. `interpret` never
//! fails: anything it cannot read becomes a reply whose response is the raw
//! text.

use serde_json::{Map, Value};

/// Thought recorded when the reply could not be read
pub const FALLBACK_THOUGHT: &str = "Processing response...";

/// A tool the model asked to run
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredAction {
    pub tool: String,
    pub params: Value,
}

/// Structured form of one model reply
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelReply {
    pub thought: String,
    pub plan: Vec<String>,
    pub actions: Vec<DeclaredAction>,
    pub response: String,
}

impl ModelReply {
    /// The reply used when the raw text cannot be interpreted
    pub fn fallback(raw: &str) -> Self {
        Self {
            thought: FALLBACK_THOUGHT.to_string(),
            plan: Vec::new(),
            actions: Vec::new(),
            response: raw.to_string(),
        }
    }
}

/// Interpret a raw completion
pub fn interpret(raw: &str) -> ModelReply {
    match extract_payload(raw).and_then(parse_payload) {
        Some(reply) => reply,
        None => {
            tracing::debug!(chars = raw.len(), "Model reply not structured, using fallback");
            ModelReply::fallback(raw)
        }
    }
}

/// Find the first balanced `{...}` in `raw`.
///
/// Braces inside JSON string literals do not count toward depth.
pub fn extract_payload(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw.get(start..)?.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return raw.get(start..=start + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_payload(payload: &str) -> Option<ModelReply> {
    let Value::Object(obj) = serde_json::from_str::<Value>(payload).ok()? else {
        return None;
    };

    let response = obj.get("response").and_then(Value::as_str)?.to_string();
    let thought = obj
        .get("thought")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let plan = obj.get("plan").map(plan_entries).unwrap_or_default();
    let actions = obj.get("actions").map(declared_actions).unwrap_or_default();

    Some(ModelReply {
        thought,
        plan,
        actions,
        response,
    })
}

fn plan_entries(value: &Value) -> Vec<String> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => ["text", "step", "description"]
                .iter()
                .find_map(|k| obj.get(*k).and_then(Value::as_str))
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

fn declared_actions(value: &Value) -> Vec<DeclaredAction> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let tool = obj
                .get("tool")
                .or_else(|| obj.get("name"))
                .and_then(Value::as_str)?
                .trim();
            if tool.is_empty() {
                return None;
            }
            let params = match obj.get("params").or_else(|| obj.get("parameters")) {
                Some(Value::Null) | None => Value::Object(Map::new()),
                Some(other) => other.clone(),
            };
            Some(DeclaredAction {
                tool: tool.to_string(),
                params,
            })
        })
        .collect()
}
