//! Orchestrator executor

use super::{SessionSnapshot, UiEvent};
use crate::directory::DoctorDirectory;
use crate::host::HostSignals;
use crate::llm::CompletionClient;
use crate::plan::PlanTracker;
use crate::prompt::build_prompt;
use crate::state_machine::{
    transition, AgentState, Effect, Event, ToolCall, TransitionError, TurnContext,
};
use crate::store::{ConversationStore, SessionStorage};
use crate::tools::{ToolContext, ToolExecutor, ToolOutput};
use crate::transcript::{
    ConversationTurn, InternalContent, Session, ToolExecutionContent, ToolInvocation, ToolStatus,
    TurnContent,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};

/// Owns one session and drives it through the state machine
pub(crate) struct Orchestrator<C, S, T>
where
    C: CompletionClient + 'static,
    S: SessionStorage + 'static,
    T: ToolExecutor + 'static,
{
    context: TurnContext,
    state: AgentState,
    session: Session,
    plan: PlanTracker,
    store: ConversationStore<S>,
    completion: Arc<C>,
    tools: Arc<T>,
    directory: Arc<dyn DoctorDirectory>,
    signals: HostSignals,
    event_rx: mpsc::Receiver<Event>,
    /// Weak so that the loop ends once callers and background tasks let go
    event_tx: mpsc::WeakSender<Event>,
    ui_tx: broadcast::Sender<UiEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl<C, S, T> Orchestrator<C, S, T>
where
    C: CompletionClient + 'static,
    S: SessionStorage + 'static,
    T: ToolExecutor + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Session,
        store: ConversationStore<S>,
        completion: Arc<C>,
        tools: Arc<T>,
        directory: Arc<dyn DoctorDirectory>,
        signals: HostSignals,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        ui_tx: broadcast::Sender<UiEvent>,
    ) -> Self {
        let context = TurnContext::new(session.id.clone(), session.language);
        let plan = PlanTracker::new();
        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            session_id: session.id.clone(),
            language: session.language,
            phase: AgentState::Idle.phase(),
            turns: session.turns.clone(),
            plan: Vec::new(),
        });
        Self {
            context,
            state: AgentState::Idle,
            session,
            plan,
            store,
            completion,
            tools,
            directory,
            signals,
            event_rx,
            event_tx,
            ui_tx,
            snapshot_tx,
        }
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn run(mut self) {
        tracing::info!(
            session_id = %self.context.session_id,
            language = %self.context.language,
            turns = self.session.turns.len(),
            "Starting orchestrator"
        );

        while let Some(event) = self.event_rx.recv().await {
            self.process_event(event).await;
        }

        tracing::info!(session_id = %self.context.session_id, "Orchestrator stopped");
    }

    async fn process_event(&mut self, event: Event) {
        // Effects may generate follow-up events; handle them without recursion
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();
            let result = match transition(&self.state, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    self.handle_rejection(event_name, e);
                    continue;
                }
            };

            let old_phase = self.state.phase();
            self.state = result.new_state;
            let new_phase = self.state.phase();
            if old_phase != new_phase {
                tracing::debug!(event = event_name, from = %old_phase, to = %new_phase, "Phase change");
                let _ = self.ui_tx.send(UiEvent::PhaseChanged { phase: new_phase });
            }

            for effect in result.effects {
                if let Some(generated) = self.execute_effect(effect).await {
                    events_to_process.push(generated);
                }
            }

            self.publish_snapshot();
        }
    }

    fn handle_rejection(&self, event_name: &'static str, error: TransitionError) {
        match error {
            TransitionError::AgentBusy | TransitionError::EmptyInput => {
                tracing::debug!(event = event_name, phase = %self.state.phase(), error = %error, "Intent refused");
                let _ = self.ui_tx.send(UiEvent::Rejected {
                    reason: error.to_string(),
                });
            }
            // Late results from work that no longer belongs to the current round
            TransitionError::InvalidTransition(detail) => {
                tracing::warn!(event = event_name, detail = %detail, "Ignoring out-of-order event");
            }
        }
    }

    /// Execute an effect and optionally return a generated event
    async fn execute_effect(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::AppendTurn { content } => {
                self.append(content);
                None
            }

            Effect::PersistSession => {
                self.store.save(&self.session).await;
                None
            }

            Effect::RequestCompletion { utterance } => {
                let prompt = build_prompt(
                    &utterance,
                    self.context.language.profile(),
                    &self.tools.definitions(),
                );
                self.spawn_completion(prompt);
                None
            }

            Effect::RecordPlan { thought, steps } => {
                let steps = self.plan.replace(steps).to_vec();
                let _ = self.ui_tx.send(UiEvent::PlanChanged {
                    steps: steps.clone(),
                });
                self.append(TurnContent::AgentInternal(InternalContent {
                    thought,
                    plan: steps,
                }));
                Some(Event::PlanRecorded)
            }

            Effect::ExecuteTool { call } => {
                self.append(TurnContent::ToolExecution(ToolExecutionContent {
                    tool: ToolInvocation {
                        name: call.name().to_string(),
                        label: call.input.label().to_string(),
                        params: call.input.to_value(),
                    },
                    status: ToolStatus::Running,
                    result: None,
                }));
                self.spawn_tool(call);
                None
            }

            Effect::ResolveTool { status, result } => {
                if let Some(index) = self.session.resolve_running_tool(status, result) {
                    if let Some(turn) = self.session.turns.get(index) {
                        let _ = self.ui_tx.send(UiEvent::TurnUpdated {
                            index,
                            turn: turn.clone(),
                        });
                    }
                }
                None
            }

            Effect::DeliverResponse { text } => {
                self.append(TurnContent::agent(text));
                Some(Event::ResponseDelivered)
            }

            Effect::ResetSession { language } => {
                tracing::info!(session_id = %self.context.session_id, %language, "Resetting session");
                self.session = self.store.clear(&self.context.session_id, language).await;
                self.context.language = language;
                self.plan.clear();
                let _ = self.ui_tx.send(UiEvent::SessionReset { language });
                None
            }

            Effect::NotifyDone => {
                // Observers woken by AgentDone must see the finished round
                self.publish_snapshot();
                let _ = self.ui_tx.send(UiEvent::AgentDone);
                None
            }
        }
    }

    fn append(&mut self, content: TurnContent) {
        let turn = ConversationTurn::new(content);
        let index = self.session.push(turn.clone());
        let _ = self.ui_tx.send(UiEvent::TurnAppended { index, turn });
    }

    fn spawn_completion(&self, prompt: String) {
        let Some(event_tx) = self.event_tx.upgrade() else {
            return;
        };
        let completion = self.completion.clone();
        let session_id = self.context.session_id.clone();

        tokio::spawn(async move {
            tracing::info!(session_id = %session_id, "Requesting completion (background)");

            let request = tokio::spawn(async move { completion.complete(&prompt).await });
            let event = match request.await {
                Ok(Ok(raw)) => Event::CompletionReceived { raw },
                Ok(Err(e)) => {
                    tracing::warn!(session_id = %session_id, kind = ?e.kind, error = %e, "Completion failed");
                    Event::CompletionFailed {
                        message: e.to_string(),
                    }
                }
                Err(e) => {
                    tracing::error!(session_id = %session_id, error = %e, "Completion task crashed");
                    Event::Fault {
                        message: format!("Completion task failed: {e}"),
                    }
                }
            };
            let _ = event_tx.send(event).await;
        });
    }

    fn spawn_tool(&self, call: ToolCall) {
        let Some(event_tx) = self.event_tx.upgrade() else {
            return;
        };
        let tools = self.tools.clone();
        let ctx = ToolContext::new(
            self.context.session_id.clone(),
            self.context.language,
            self.directory.clone(),
            self.signals.clone(),
        );

        tokio::spawn(async move {
            let tool_name = call.name().to_string();
            tracing::info!(tool = %tool_name, id = %call.id, "Executing tool (background)");

            let input = call.input;
            let job = tokio::spawn(async move { tools.execute(&input, ctx).await });
            let output = match job.await {
                Ok(output) => output,
                Err(e) => {
                    tracing::error!(tool = %tool_name, error = %e, "Tool crashed");
                    ToolOutput::error(format!("{tool_name} failed unexpectedly"))
                }
            };
            let _ = event_tx
                .send(Event::ToolResolved {
                    call_id: call.id,
                    output,
                })
                .await;
        });
    }

    fn publish_snapshot(&self) {
        self.snapshot_tx.send_replace(SessionSnapshot {
            session_id: self.session.id.clone(),
            language: self.context.language,
            phase: self.state.phase(),
            turns: self.session.turns.clone(),
            plan: self.plan.steps().to_vec(),
        });
    }
}
