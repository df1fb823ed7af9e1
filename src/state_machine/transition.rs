//! Pure state transition function
//!
//! idle -> thinking -> planning -> executing -> responding -> idle. A round
//! with no declared actions goes from planning straight to responding.

use super::{AgentState, Effect, Event, ToolCall, TurnContext};
use crate::interpreter::{interpret, ModelReply};
use crate::store::INTERRUPTED_RESULT;
use crate::tools::ToolInput;
use crate::transcript::ToolStatus;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug, PartialEq)]
pub struct TransitionResult {
    pub new_state: AgentState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: AgentState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Agent is busy, try again when the current reply is finished")]
    AgentBusy,
    #[error("Nothing to send")]
    EmptyInput,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function: no I/O, same inputs give the same outputs
pub fn transition(
    state: &AgentState,
    context: &TurnContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // User submission
        // ============================================================
        (AgentState::Idle, Event::UserSubmit { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            Ok(TransitionResult::new(AgentState::Thinking)
                .with_effect(Effect::append_user(text))
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::RequestCompletion {
                    utterance: text.to_string(),
                }))
        }

        // Busy states ignore submissions entirely
        (_, Event::UserSubmit { .. }) => Err(TransitionError::AgentBusy),

        // ============================================================
        // Completion
        // ============================================================
        (AgentState::Thinking, Event::CompletionReceived { raw }) => {
            let reply = interpret(&raw);
            let record = Effect::RecordPlan {
                thought: reply.thought.clone(),
                steps: reply.plan.clone(),
            };
            Ok(TransitionResult::new(AgentState::Planning { reply }).with_effect(record))
        }

        (AgentState::Thinking, Event::CompletionFailed { .. }) => Ok(apology_reset(state, context)),

        // ============================================================
        // Planning -> tool execution
        // ============================================================
        (AgentState::Planning { reply }, Event::PlanRecorded) => {
            let mut calls = tool_calls(reply).into_iter();
            match calls.next() {
                Some(first) => Ok(TransitionResult::new(AgentState::Executing {
                    current: first.clone(),
                    remaining: calls.collect(),
                    response: reply.response.clone(),
                })
                .with_effect(Effect::execute_tool(first))
                .with_effect(Effect::PersistSession)),
                None => Ok(TransitionResult::new(AgentState::Responding {
                    response: reply.response.clone(),
                })
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::DeliverResponse {
                    text: reply.response.clone(),
                })),
            }
        }

        // Tools run strictly one after another; a failure does not stop the rest
        (
            AgentState::Executing {
                current,
                remaining,
                response,
            },
            Event::ToolResolved { call_id, output },
        ) if call_id == current.id => {
            let status = if output.success {
                ToolStatus::Completed
            } else {
                ToolStatus::Failed
            };
            let resolve = Effect::ResolveTool {
                status,
                result: output.output,
            };

            if let Some((next, rest)) = remaining.split_first() {
                Ok(TransitionResult::new(AgentState::Executing {
                    current: next.clone(),
                    remaining: rest.to_vec(),
                    response: response.clone(),
                })
                .with_effect(resolve)
                .with_effect(Effect::execute_tool(next.clone()))
                .with_effect(Effect::PersistSession))
            } else {
                Ok(TransitionResult::new(AgentState::Responding {
                    response: response.clone(),
                })
                .with_effect(resolve)
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::DeliverResponse {
                    text: response.clone(),
                }))
            }
        }

        (AgentState::Responding { .. }, Event::ResponseDelivered) => {
            Ok(TransitionResult::new(AgentState::Idle)
                .with_effect(Effect::PersistSession)
                .with_effect(Effect::NotifyDone))
        }

        // ============================================================
        // Session management (idle only)
        // ============================================================
        (AgentState::Idle, Event::ClearConversation) => {
            Ok(TransitionResult::new(AgentState::Idle)
                .with_effect(Effect::ResetSession {
                    language: context.language,
                })
                .with_effect(Effect::PersistSession))
        }

        (AgentState::Idle, Event::SwitchLanguage { language }) if language == context.language => {
            Ok(TransitionResult::new(AgentState::Idle))
        }

        (AgentState::Idle, Event::SwitchLanguage { language }) => {
            Ok(TransitionResult::new(AgentState::Idle)
                .with_effect(Effect::ResetSession { language })
                .with_effect(Effect::PersistSession))
        }

        (_, Event::ClearConversation | Event::SwitchLanguage { .. }) => {
            Err(TransitionError::AgentBusy)
        }

        // ============================================================
        // Accepted in any state
        // ============================================================
        (_, Event::HostMessage { text }) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(TransitionError::EmptyInput);
            }
            Ok(TransitionResult::new(state.clone())
                .with_effect(Effect::append_agent(text))
                .with_effect(Effect::PersistSession))
        }

        (_, Event::Fault { .. }) => Ok(apology_reset(state, context)),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} while {}",
            event.name(),
            state.phase()
        ))),
    }
}

/// Resolve the model's declared actions into tool calls, in order
fn tool_calls(reply: &ModelReply) -> Vec<ToolCall> {
    reply
        .actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            ToolCall::new(
                format!("call_{i}_{}", action.tool),
                ToolInput::from_name_and_value(&action.tool, action.params.clone()),
            )
        })
        .collect()
}

/// One apology turn and back to idle. A tool left running is marked failed
/// so no turn stays in flight.
fn apology_reset(state: &AgentState, context: &TurnContext) -> TransitionResult {
    let mut result = TransitionResult::new(AgentState::Idle);
    if let AgentState::Executing { .. } = state {
        result = result.with_effect(Effect::ResolveTool {
            status: ToolStatus::Failed,
            result: INTERRUPTED_RESULT.to_string(),
        });
    }
    result
        .with_effect(Effect::append_agent(context.language.profile().apology))
        .with_effect(Effect::PersistSession)
        .with_effect(Effect::NotifyDone)
}
