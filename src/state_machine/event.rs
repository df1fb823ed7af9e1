//! Events that drive the agent

use crate::language::Language;
use crate::tools::ToolOutput;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // User intents
    UserSubmit { text: String },
    ClearConversation,
    SwitchLanguage { language: Language },

    // Completion events
    CompletionReceived { raw: String },
    CompletionFailed { message: String },

    // Generated by effects within a round
    PlanRecorded,
    ToolResolved { call_id: String, output: ToolOutput },
    ResponseDelivered,

    /// Plain agent message from a host collaborator (e.g. booking outcome)
    HostMessage { text: String },

    /// Unhandled failure caught at the orchestrator boundary
    Fault { message: String },
}

impl Event {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Event::UserSubmit { .. } => "user_submit",
            Event::ClearConversation => "clear_conversation",
            Event::SwitchLanguage { .. } => "switch_language",
            Event::CompletionReceived { .. } => "completion_received",
            Event::CompletionFailed { .. } => "completion_failed",
            Event::PlanRecorded => "plan_recorded",
            Event::ToolResolved { .. } => "tool_resolved",
            Event::ResponseDelivered => "response_delivered",
            Event::HostMessage { .. } => "host_message",
            Event::Fault { .. } => "fault",
        }
    }
}
