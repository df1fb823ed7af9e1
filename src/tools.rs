//! Tools the model can invoke
//!
//! Tools are stateless singletons; per-call context arrives via
//! `ToolContext`. Names coming back from the model are resolved once into
//! `ToolInput`, with one `Unknown` fallback for anything unrecognised, and
//! each variant is handed to its tool already typed.

mod booking;
mod emergency;
mod guidance;
mod specialist;

pub use booking::BookAppointmentTool;
pub use emergency::EmergencyProtocolTool;
pub use guidance::{HealthTipTool, SearchSymptomsTool, SymptomQuery, TipRequest};
pub use specialist::{FindSpecialistTool, SpecialistQuery};

use crate::directory::DoctorDirectory;
use crate::host::{BookingPrefill, HostSignal, HostSignals};
use crate::language::Language;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result recorded for a tool name nobody recognises
pub const UNKNOWN_TOOL_RESULT: &str = "Done";

/// Result from tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Tool description rendered into the prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Strongly typed tool input
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    FindSpecialist(SpecialistQuery),
    BookAppointment(BookingPrefill),
    EmergencyProtocol,
    HealthTip(TipRequest),
    SearchSymptoms(SymptomQuery),
    Unknown { name: String, params: Value },
}

impl ToolInput {
    pub fn name(&self) -> &str {
        match self {
            ToolInput::FindSpecialist(_) => "find_specialist",
            ToolInput::BookAppointment(_) => "book_appointment",
            ToolInput::EmergencyProtocol => "emergency_protocol",
            ToolInput::HealthTip(_) => "health_tip",
            ToolInput::SearchSymptoms(_) => "search_symptoms",
            ToolInput::Unknown { name, .. } => name,
        }
    }

    /// Short human label shown on the transcript
    pub fn label(&self) -> &str {
        match self {
            ToolInput::FindSpecialist(_) => "Searching specialists",
            ToolInput::BookAppointment(_) => "Opening booking form",
            ToolInput::EmergencyProtocol => "Emergency protocol",
            ToolInput::HealthTip(_) => "Preparing health tip",
            ToolInput::SearchSymptoms(_) => "Reviewing symptoms",
            ToolInput::Unknown { name, .. } => name,
        }
    }

    pub fn to_value(&self) -> Value {
        let value = match self {
            ToolInput::FindSpecialist(input) => serde_json::to_value(input),
            ToolInput::BookAppointment(input) => serde_json::to_value(input),
            ToolInput::HealthTip(input) => serde_json::to_value(input),
            ToolInput::SearchSymptoms(input) => serde_json::to_value(input),
            ToolInput::EmergencyProtocol => return Value::Object(Map::new()),
            ToolInput::Unknown { params, .. } => return params.clone(),
        };
        value.unwrap_or(Value::Null)
    }

    /// Parse from a tool name and its params.
    ///
    /// Known tools never degrade to `Unknown`: unreadable params fall back to
    /// the tool's defaults.
    pub fn from_name_and_value(name: &str, params: Value) -> Self {
        fn typed<T: serde::de::DeserializeOwned + Default>(params: &Value) -> T {
            serde_json::from_value(params.clone()).unwrap_or_default()
        }

        match name.trim().to_ascii_lowercase().as_str() {
            "find_specialist" => ToolInput::FindSpecialist(typed(&params)),
            "book_appointment" => ToolInput::BookAppointment(typed(&params)),
            "emergency_protocol" => ToolInput::EmergencyProtocol,
            "health_tip" => ToolInput::HealthTip(typed(&params)),
            "search_symptoms" => ToolInput::SearchSymptoms(typed(&params)),
            _ => ToolInput::Unknown {
                name: name.to_string(),
                params,
            },
        }
    }
}

/// All context needed for a tool invocation
#[derive(Clone)]
pub struct ToolContext {
    /// The session this tool is executing within
    pub session_id: String,
    pub language: Language,
    directory: Arc<dyn DoctorDirectory>,
    signals: HostSignals,
}

impl ToolContext {
    pub fn new(
        session_id: String,
        language: Language,
        directory: Arc<dyn DoctorDirectory>,
        signals: HostSignals,
    ) -> Self {
        Self {
            session_id,
            language,
            directory,
            signals,
        }
    }

    pub fn directory(&self) -> &dyn DoctorDirectory {
        self.directory.as_ref()
    }

    /// Fire-and-forget signal to the host UI
    pub fn signal(&self, signal: HostSignal) {
        tracing::debug!(session_id = %self.session_id, ?signal, "Host signal");
        self.signals.emit(signal);
    }
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Parsed params, as carried by the matching `ToolInput` variant
    type Input: Sync;

    fn name(&self) -> &'static str;

    /// Tool description for the model
    fn description(&self) -> String;

    /// JSON schema for tool params
    fn input_schema(&self) -> Value;

    /// Execute the tool with all context provided via `ToolContext`
    async fn run(&self, input: &Self::Input, ctx: ToolContext) -> ToolOutput;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

/// Executor for tools, the seam the orchestrator runs tools through
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Run one tool to completion
    async fn execute(&self, input: &ToolInput, ctx: ToolContext) -> ToolOutput;

    /// Definitions for the prompt
    fn definitions(&self) -> Vec<ToolDefinition>;
}

#[async_trait]
impl<T: ToolExecutor + ?Sized> ToolExecutor for Arc<T> {
    async fn execute(&self, input: &ToolInput, ctx: ToolContext) -> ToolOutput {
        (**self).execute(input, ctx).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        (**self).definitions()
    }
}

/// The tools available to the assistant, one handler per `ToolInput` variant
pub struct ToolRegistry {
    find_specialist: FindSpecialistTool,
    book_appointment: BookAppointmentTool,
    emergency_protocol: EmergencyProtocolTool,
    health_tip: HealthTipTool,
    search_symptoms: SearchSymptomsTool,
}

impl ToolRegistry {
    pub fn standard() -> Self {
        Self {
            find_specialist: FindSpecialistTool,
            book_appointment: BookAppointmentTool,
            emergency_protocol: EmergencyProtocolTool,
            health_tip: HealthTipTool,
            search_symptoms: SearchSymptomsTool,
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, input: &ToolInput, ctx: ToolContext) -> ToolOutput {
        match input {
            ToolInput::FindSpecialist(query) => self.find_specialist.run(query, ctx).await,
            ToolInput::BookAppointment(prefill) => self.book_appointment.run(prefill, ctx).await,
            ToolInput::EmergencyProtocol => self.emergency_protocol.run(&(), ctx).await,
            ToolInput::HealthTip(request) => self.health_tip.run(request, ctx).await,
            ToolInput::SearchSymptoms(query) => self.search_symptoms.run(query, ctx).await,
            ToolInput::Unknown { name, .. } => {
                tracing::warn!(tool = %name, "Model requested an unknown tool");
                ToolOutput::success(UNKNOWN_TOOL_RESULT)
            }
        }
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            self.find_specialist.definition(),
            self.book_appointment.definition(),
            self.emergency_protocol.definition(),
            self.health_tip.definition(),
            self.search_symptoms.definition(),
        ]
    }
}
