//! Text-only guidance tools: health tips and symptom lookup

use super::{Tool, ToolContext, ToolOutput};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

const GENERAL_TIP: &str = "Drink enough water, sleep 7 to 9 hours, and aim for 30 minutes of activity most days.";

const TIPS: &[(&[&str], &str)] = &[
    (
        &["fever", "temperature"],
        "Rest, drink plenty of fluids and check your temperature regularly. See a doctor if it stays above 39°C (102°F) or lasts more than three days.",
    ),
    (
        &["cold", "cough", "flu", "throat"],
        "Warm fluids, honey and rest help most colds. Seek care if breathing becomes difficult or symptoms last beyond ten days.",
    ),
    (
        &["headache", "migraine"],
        "Rest in a dark, quiet room and stay hydrated. A sudden, severe headache needs urgent attention.",
    ),
    (
        &["sleep", "insomnia"],
        "Keep a regular sleep schedule and avoid screens for an hour before bed.",
    ),
    (
        &["hydration", "water", "dehydration"],
        "Sip water throughout the day; pale yellow urine is a good sign you're hydrated.",
    ),
    (
        &["stress", "anxiety"],
        "Slow breathing, short walks and talking to someone you trust can ease stress.",
    ),
];

/// Symptom keywords and the specialty usually consulted for them
const SYMPTOM_SPECIALTIES: &[(&str, &str)] = &[
    ("chest pain", "Cardiologist"),
    ("palpitation", "Cardiologist"),
    ("fever", "General Physician"),
    ("fatigue", "General Physician"),
    ("cough", "Pulmonologist"),
    ("breath", "Pulmonologist"),
    ("rash", "Dermatologist"),
    ("itch", "Dermatologist"),
    ("acne", "Dermatologist"),
    ("ear pain", "ENT"),
    ("earache", "ENT"),
    ("throat", "ENT"),
    ("sinus", "ENT"),
    ("headache", "Neurologist"),
    ("dizz", "Neurologist"),
    ("joint", "Orthopedist"),
    ("back pain", "Orthopedist"),
    ("stomach", "Gastroenterologist"),
    ("nausea", "Gastroenterologist"),
    ("anxiety", "Psychiatrist"),
    ("eye", "Ophthalmologist"),
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TipRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SymptomQuery {
    #[serde(alias = "query", alias = "symptom", deserialize_with = "string_or_list")]
    pub symptoms: Vec<String>,
}

/// Accepts `"fever, cough"` as well as `["fever", "cough"]`
fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let items = match Value::deserialize(deserializer)? {
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

pub struct HealthTipTool;

#[async_trait]
impl Tool for HealthTipTool {
    type Input = TipRequest;

    fn name(&self) -> &'static str {
        "health_tip"
    }

    fn description(&self) -> String {
        "Give a short general wellness tip, optionally about a topic such as fever, sleep or hydration.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": {"type": "string"}
            }
        })
    }

    async fn run(&self, request: &TipRequest, _ctx: ToolContext) -> ToolOutput {
        let topic = request.topic.as_deref().unwrap_or_default().to_lowercase();
        let tip = TIPS
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| topic.contains(*k)))
            .map_or(GENERAL_TIP, |(_, tip)| *tip);
        ToolOutput::success(tip)
    }
}

pub struct SearchSymptomsTool;

#[async_trait]
impl Tool for SearchSymptomsTool {
    type Input = SymptomQuery;

    fn name(&self) -> &'static str {
        "search_symptoms"
    }

    fn description(&self) -> String {
        "Look up which kind of specialist usually handles the given symptoms.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symptoms": {
                    "type": "array",
                    "items": {"type": "string"}
                }
            }
        })
    }

    async fn run(&self, query: &SymptomQuery, _ctx: ToolContext) -> ToolOutput {
        if query.symptoms.is_empty() {
            return ToolOutput::success("No symptoms provided");
        }

        let lines: Vec<String> = query
            .symptoms
            .iter()
            .map(|symptom| {
                let lower = symptom.to_lowercase();
                match SYMPTOM_SPECIALTIES.iter().find(|(k, _)| lower.contains(*k)) {
                    Some((_, specialty)) => format!("{symptom}: {specialty}"),
                    None => format!("{symptom}: General Physician"),
                }
            })
            .collect();
        ToolOutput::success(lines.join("; "))
    }
}
