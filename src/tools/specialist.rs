//! Specialist search against the doctor directory

use super::{Tool, ToolContext, ToolOutput};
use crate::directory::DirectoryPage;
use crate::host::HostSignal;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub struct FindSpecialistTool;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialistQuery {
    #[serde(alias = "speciality", alias = "specialization", skip_serializing_if = "Option::is_none")]
    pub specialty: Option<String>,
}

fn summarize(specialty: Option<&str>, page: &DirectoryPage) -> String {
    match (page.count, specialty) {
        (0, Some(s)) => format!("No doctors found for {s}"),
        (0, None) => "No doctors found".to_string(),
        (1, Some(s)) => format!("Found 1 doctor for {s}"),
        (1, None) => "Found 1 doctor".to_string(),
        (n, Some(s)) => format!("Found {n} doctors for {s}"),
        (n, None) => format!("Found {n} doctors"),
    }
}

#[async_trait]
impl Tool for FindSpecialistTool {
    type Input = SpecialistQuery;

    fn name(&self) -> &'static str {
        "find_specialist"
    }

    fn description(&self) -> String {
        "Search the doctor directory for a specialty (for example General Physician, Dermatologist, Cardiologist, ENT) and show the results to the user.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "specialty": {
                    "type": "string",
                    "description": "Medical specialty to search for"
                }
            }
        })
    }

    async fn run(&self, query: &SpecialistQuery, ctx: ToolContext) -> ToolOutput {
        let specialty = query
            .specialty
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        match ctx.directory().query(specialty).await {
            Ok(page) => {
                let summary = summarize(specialty, &page);
                tracing::info!(session_id = %ctx.session_id, specialty = ?specialty, count = page.count, "Specialist search finished");
                ctx.signal(HostSignal::ShowSpecialists {
                    specialty: specialty.map(str::to_string),
                    doctors: page.items,
                });
                ToolOutput::success(summary)
            }
            Err(e) => {
                tracing::warn!(session_id = %ctx.session_id, error = %e, "Specialist search failed");
                ToolOutput::error(format!("Search failed: {e}"))
            }
        }
    }
}
