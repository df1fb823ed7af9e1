//! Effects produced by state transitions

use crate::language::Language;
use crate::state_machine::state::ToolCall;
use crate::transcript::{ToolStatus, TurnContent};

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a turn to the transcript (timestamped by the executor)
    AppendTurn { content: TurnContent },

    /// Save the session
    PersistSession,

    /// Build the prompt and call the completion service (background task)
    RequestCompletion { utterance: String },

    /// Replace the plan and append the reasoning turn; yields `PlanRecorded`
    RecordPlan { thought: String, steps: Vec<String> },

    /// Append a running tool turn and execute the tool (background task)
    ExecuteTool { call: ToolCall },

    /// Resolve the running tool turn in place
    ResolveTool { status: ToolStatus, result: String },

    /// Append the final agent turn; yields `ResponseDelivered`
    DeliverResponse { text: String },

    /// Erase the stored session and reseed it
    ResetSession { language: Language },

    /// Tell observers the round is over
    NotifyDone,
}

impl Effect {
    pub fn append_agent(text: impl Into<String>) -> Self {
        Effect::AppendTurn {
            content: TurnContent::agent(text),
        }
    }

    pub fn append_user(text: impl Into<String>) -> Self {
        Effect::AppendTurn {
            content: TurnContent::user(text),
        }
    }

    pub fn execute_tool(call: ToolCall) -> Self {
        Effect::ExecuteTool { call }
    }
}
