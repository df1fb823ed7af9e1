//! Prompt construction
//!
//! One self-contained request per user utterance. Earlier turns are not
//! replayed, so the model sees only the current message.

use crate::language::LanguageProfile;
use crate::tools::ToolDefinition;
use serde_json::Value;
use std::fmt::Write as _;

const PREAMBLE: &str = "You are a health-triage assistant inside a doctor booking app. \
Help the user understand their symptoms, suggest sensible next steps, and use the tools below \
to find specialists, open the booking form, or escalate emergencies. You do not diagnose.";

/// Build the completion request for one utterance
pub fn build_prompt(utterance: &str, profile: &LanguageProfile, tools: &[ToolDefinition]) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(PREAMBLE);
    prompt.push_str("\n\nTools:\n");
    for tool in tools {
        let _ = write!(prompt, "- {}: {}", tool.name, tool.description);
        let params = param_names(&tool.input_schema);
        if !params.is_empty() {
            let _ = write!(prompt, " Params: {}.", params.join(", "));
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "\nRules:\n\
         - Every action you list is executed for real, immediately and in order. Nothing is simulated. \
         Only list an action if you want it to happen now.\n\
         - For red-flag symptoms (chest pain, trouble breathing, stroke signs, heavy bleeding, fainting) \
         include emergency_protocol as the first action.\n",
    );
    let _ = writeln!(
        prompt,
        "- Write \"response\" in {}. Keep it short, warm and practical.",
        profile.display_name
    );

    prompt.push_str(
        "\nReply with one JSON object and nothing else. It must have exactly these fields:\n\
         {\"thought\": string, \"plan\": [string, ...], \"actions\": [{\"tool\": string, \"params\": object}, ...], \"response\": string}\n\
         - thought: your brief reasoning\n\
         - plan: the ordered steps you intend to take\n\
         - actions: zero or more tools to run\n\
         - response: what the user will read\n",
    );

    let _ = write!(prompt, "\nUser message:\n{}", utterance.trim());
    prompt
}

fn param_names(schema: &Value) -> Vec<&str> {
    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().map(String::as_str).collect())
        .unwrap_or_default()
}
