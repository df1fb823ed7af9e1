//! Mock implementations for testing
//!
//! These mocks enable integration testing without real I/O.

use super::{spawn_orchestrator, OrchestratorHandle, OrchestratorParts, SessionSnapshot, UiEvent};
use crate::directory::{DirectoryError, DirectoryPage, Doctor, DoctorDirectory};
use crate::host::HostSignal;
use crate::language::Language;
use crate::llm::{CompletionClient, LlmError};
use crate::state_machine::AgentPhase;
use crate::store::{SessionStorage, StoreError, StoreResult};
use crate::tools::{ToolContext, ToolDefinition, ToolExecutor, ToolInput, ToolOutput, ToolRegistry};
use crate::transcript::{ConversationTurn, Session, TurnKind};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

// ============================================================================
// Mock Completion Client
// ============================================================================

/// Mock completion client that returns queued replies
pub struct MockCompletionClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    model_id: String,
    /// Record of all prompts sent
    prompts: Mutex<Vec<String>>,
}

impl MockCompletionClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful raw reply
    pub fn queue_response(&self, raw: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(raw.into()));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for MockCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Mock completion client that waits before answering, for busy-state tests
pub struct DelayedMockCompletionClient {
    inner: MockCompletionClient,
    delay: Duration,
}

impl DelayedMockCompletionClient {
    pub fn new(model_id: impl Into<String>, delay: Duration) -> Self {
        Self {
            inner: MockCompletionClient::new(model_id),
            delay,
        }
    }

    pub fn queue_response(&self, raw: impl Into<String>) {
        self.inner.queue_response(raw);
    }

    pub fn recorded_prompts(&self) -> Vec<String> {
        self.inner.recorded_prompts()
    }
}

#[async_trait]
impl CompletionClient for DelayedMockCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        tokio::time::sleep(self.delay).await;
        self.inner.complete(prompt).await
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }
}

// ============================================================================
// Mock Doctor Directory
// ============================================================================

pub struct MockDirectory {
    doctors: Vec<Doctor>,
    fail: bool,
    queries: Mutex<Vec<Option<String>>>,
}

impl MockDirectory {
    /// Directory returning `count` general physicians for every query
    pub fn with_doctors(count: usize) -> Self {
        let doctors = (1..=count)
            .map(|i| Doctor {
                id: format!("doc-{i}"),
                name: format!("Dr. Test {i}"),
                specialty: "General Physician".to_string(),
                location: None,
                rating: None,
            })
            .collect();
        Self {
            doctors,
            fail: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Directory that answers every query with HTTP 503
    pub fn failing() -> Self {
        Self {
            doctors: Vec::new(),
            fail: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded_queries(&self) -> Vec<Option<String>> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DoctorDirectory for MockDirectory {
    async fn query(&self, specialty: Option<&str>) -> Result<DirectoryPage, DirectoryError> {
        self.queries
            .lock()
            .unwrap()
            .push(specialty.map(ToString::to_string));
        if self.fail {
            return Err(DirectoryError::Status(503));
        }
        Ok(DirectoryPage {
            count: self.doctors.len(),
            items: self.doctors.clone(),
        })
    }
}

// ============================================================================
// Mock Storage
// ============================================================================

/// In-memory session storage
pub struct InMemoryStorage {
    documents: Mutex<HashMap<String, Value>>,
    device_id: String,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            device_id: "test-device".to_string(),
        }
    }

    /// Store a document as-is, bypassing serialization of `Session`
    pub fn insert_raw(&self, id: &str, document: Value) {
        self.documents
            .lock()
            .unwrap()
            .insert(id.to_string(), document);
    }

    pub fn document(&self, id: &str) -> Option<Value> {
        self.documents.lock().unwrap().get(id).cloned()
    }

    pub fn device(&self) -> &str {
        &self.device_id
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemoryStorage {
    async fn device_id(&self) -> StoreResult<String> {
        Ok(self.device_id.clone())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Value>> {
        Ok(self.document(id))
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        let document = serde_json::to_value(session)?;
        self.insert_raw(&session.id, document);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        self.documents.lock().unwrap().remove(id);
        Ok(())
    }
}

/// Storage where every operation fails
pub struct FailingStorage;

#[async_trait]
impl SessionStorage for FailingStorage {
    async fn device_id(&self) -> StoreResult<String> {
        Err(StoreError::Unavailable("device id".into()))
    }

    async fn get(&self, _id: &str) -> StoreResult<Option<Value>> {
        Err(StoreError::Unavailable("read".into()))
    }

    async fn put(&self, _session: &Session) -> StoreResult<()> {
        Err(StoreError::Unavailable("write".into()))
    }

    async fn delete(&self, _id: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable("delete".into()))
    }
}

// ============================================================================
// Mock Tool Executor
// ============================================================================

/// Standard registry that records executions and can be told to crash
pub struct MockToolExecutor {
    registry: ToolRegistry,
    panic_on: Option<String>,
    executions: Mutex<Vec<String>>,
}

impl MockToolExecutor {
    pub fn new() -> Self {
        Self {
            registry: ToolRegistry::standard(),
            panic_on: None,
            executions: Mutex::new(Vec::new()),
        }
    }

    /// Panic whenever the named tool runs
    pub fn with_panic(mut self, name: impl Into<String>) -> Self {
        self.panic_on = Some(name.into());
        self
    }

    pub fn recorded_executions(&self) -> Vec<String> {
        self.executions.lock().unwrap().clone()
    }
}

impl Default for MockToolExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for MockToolExecutor {
    async fn execute(&self, input: &ToolInput, ctx: ToolContext) -> ToolOutput {
        self.executions
            .lock()
            .unwrap()
            .push(input.name().to_string());
        if self.panic_on.as_deref() == Some(input.name()) {
            panic!("{} exploded", input.name());
        }
        self.registry.execute(input, ctx).await
    }

    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }
}

// ============================================================================
// Test Orchestrator
// ============================================================================

/// Helper for building test orchestrators with minimal boilerplate
pub struct TestOrchestrator {
    pub handle: OrchestratorHandle,
    ui_rx: broadcast::Receiver<UiEvent>,
    host_rx: broadcast::Receiver<HostSignal>,
}

pub struct TestOrchestratorBuilder {
    language: Language,
    completion: Arc<dyn CompletionClient>,
    storage: Arc<dyn SessionStorage>,
    tools: Arc<dyn ToolExecutor>,
    directory: Arc<dyn DoctorDirectory>,
}

impl TestOrchestrator {
    pub fn builder() -> TestOrchestratorBuilder {
        TestOrchestratorBuilder {
            language: Language::En,
            completion: Arc::new(MockCompletionClient::new("test-model")),
            storage: Arc::new(InMemoryStorage::new()),
            tools: Arc::new(ToolRegistry::standard()),
            directory: Arc::new(MockDirectory::with_doctors(3)),
        }
    }

    /// Wait for `AgentDone` with timeout
    pub async fn wait_for_done(&mut self, timeout: Duration) -> bool {
        self.wait_for_event(timeout, |e| matches!(e, UiEvent::AgentDone))
            .await
            .is_some()
    }

    /// Wait for a `Rejected` event, returning its reason
    pub async fn wait_for_rejection(&mut self, timeout: Duration) -> Option<String> {
        match self
            .wait_for_event(timeout, |e| matches!(e, UiEvent::Rejected { .. }))
            .await
        {
            Some(UiEvent::Rejected { reason }) => Some(reason),
            _ => None,
        }
    }

    async fn wait_for_event(
        &mut self,
        timeout: Duration,
        pred: impl Fn(&UiEvent) -> bool,
    ) -> Option<UiEvent> {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.ui_rx.recv()).await {
                Ok(Ok(event)) if pred(&event) => return Some(event),
                Ok(Err(broadcast::error::RecvError::Closed)) => return None,
                _ => continue,
            }
        }
        None
    }

    pub async fn wait_for_snapshot(
        &self,
        timeout: Duration,
        pred: impl FnMut(&SessionSnapshot) -> bool,
    ) -> bool {
        let mut rx = self.handle.watch();
        let reached = matches!(
            tokio::time::timeout(timeout, rx.wait_for(pred)).await,
            Ok(Ok(_))
        );
        reached
    }

    pub async fn wait_for_phase(&self, phase: AgentPhase, timeout: Duration) -> bool {
        self.wait_for_snapshot(timeout, |s| s.phase == phase).await
    }

    /// Next host signal raised by a tool, if any arrives in time
    pub async fn next_host_signal(&mut self, timeout: Duration) -> Option<HostSignal> {
        tokio::time::timeout(timeout, self.host_rx.recv())
            .await
            .ok()
            .and_then(Result::ok)
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.handle.snapshot().turns
    }

    pub fn kinds(&self) -> Vec<TurnKind> {
        self.turns().iter().map(ConversationTurn::kind).collect()
    }
}

impl TestOrchestratorBuilder {
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn completion(mut self, completion: Arc<dyn CompletionClient>) -> Self {
        self.completion = completion;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn tools(mut self, tools: Arc<dyn ToolExecutor>) -> Self {
        self.tools = tools;
        self
    }

    pub fn directory(mut self, directory: Arc<dyn DoctorDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub async fn build(self) -> TestOrchestrator {
        let handle = spawn_orchestrator(OrchestratorParts {
            language: self.language,
            completion: self.completion,
            storage: self.storage,
            tools: self.tools,
            directory: self.directory,
        })
        .await;
        let ui_rx = handle.subscribe();
        let host_rx = handle.host_signals();
        TestOrchestrator {
            handle,
            ui_rx,
            host_rx,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{migrate_document, INTERRUPTED_RESULT};
    use crate::transcript::{ToolStatus, TurnContent};
    use chrono::Utc;
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(2);

    const FEVER_REPLY: &str = r#"Sure, here is my assessment:
{"thought": "Fever suggests infection", "plan": ["Find a general physician", "Share fever advice"], "actions": [{"tool": "find_specialist", "params": {"specialty": "General Physician"}}], "response": "I found some general physicians for you."}
Hope that helps."#;

    fn tool_turns(turns: &[ConversationTurn]) -> Vec<(String, ToolStatus, Option<String>)> {
        turns
            .iter()
            .filter_map(ConversationTurn::as_tool_execution)
            .map(|t| (t.tool.name.clone(), t.status, t.result.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_mock_completion_client() {
        let mock = MockCompletionClient::new("test-model");
        mock.queue_response("{}");

        assert_eq!(mock.complete("p").await.unwrap(), "{}");
        // Nothing left queued
        assert!(mock.complete("p").await.is_err());
        assert_eq!(mock.recorded_prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_in_memory_storage() {
        let storage = InMemoryStorage::new();
        let session = Session::seeded("s1", Language::Es);

        storage.put(&session).await.unwrap();
        let doc = storage.get("s1").await.unwrap().unwrap();
        assert_eq!(migrate_document(doc, "s1", Language::En, Utc::now()), session);

        storage.delete("s1").await.unwrap();
        assert!(storage.get("s1").await.unwrap().is_none());
    }

    /// One round with one tool: user, plan, tool, response
    #[tokio::test]
    async fn test_fever_round_with_specialist_search() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response(FEVER_REPLY);
        let storage = Arc::new(InMemoryStorage::new());

        let mut rt = TestOrchestrator::builder()
            .completion(llm.clone())
            .storage(storage.clone())
            .build()
            .await;
        assert_eq!(rt.kinds(), vec![TurnKind::Agent]);

        rt.handle
            .submit("I have a fever and want to see a doctor")
            .await
            .unwrap();
        assert!(rt.wait_for_done(WAIT).await);

        assert_eq!(
            rt.kinds(),
            vec![
                TurnKind::Agent,
                TurnKind::User,
                TurnKind::AgentInternal,
                TurnKind::ToolExecution,
                TurnKind::Agent,
            ]
        );

        let turns = rt.turns();
        let tools = tool_turns(&turns);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].0, "find_specialist");
        assert_eq!(tools[0].1, ToolStatus::Completed);
        assert!(tools[0].2.as_deref().unwrap().contains('3'));

        let TurnContent::AgentInternal(internal) = &turns[2].content else {
            panic!("expected reasoning turn");
        };
        assert_eq!(internal.thought, "Fever suggests infection");
        assert_eq!(internal.plan.len(), 2);
        assert_eq!(turns[4].content.text(), Some("I found some general physicians for you."));

        let snapshot = rt.handle.snapshot();
        assert_eq!(snapshot.phase, AgentPhase::Idle);
        assert_eq!(snapshot.plan.len(), 2);

        // The prompt carries the utterance and the tool list
        let prompts = llm.recorded_prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("I have a fever and want to see a doctor"));
        assert!(prompts[0].contains("find_specialist"));

        match rt.next_host_signal(WAIT).await {
            Some(HostSignal::ShowSpecialists { doctors, .. }) => assert_eq!(doctors.len(), 3),
            other => panic!("expected specialists signal, got {other:?}"),
        }

        // Persisted document matches the live session
        let doc = storage.document(storage.device()).unwrap();
        let stored = migrate_document(doc, storage.device(), Language::En, Utc::now());
        assert_eq!(stored.turns, turns);
    }

    #[tokio::test]
    async fn test_completion_failure_appends_apology() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_error(LlmError::server_error("upstream 503"));

        let mut rt = TestOrchestrator::builder()
            .language(Language::Es)
            .completion(llm)
            .build()
            .await;
        rt.handle.submit("Me duele la cabeza").await.unwrap();
        assert!(rt.wait_for_done(WAIT).await);

        assert_eq!(
            rt.kinds(),
            vec![TurnKind::Agent, TurnKind::User, TurnKind::Agent]
        );
        let turns = rt.turns();
        assert_eq!(turns[2].content.text(), Some(Language::Es.profile().apology));
        assert_eq!(rt.handle.snapshot().phase, AgentPhase::Idle);
    }

    #[tokio::test]
    async fn test_plain_text_reply_becomes_response() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response("Please drink water and rest.");

        let mut rt = TestOrchestrator::builder().completion(llm).build().await;
        rt.handle.submit("I feel dizzy").await.unwrap();
        assert!(rt.wait_for_done(WAIT).await);

        let turns = rt.turns();
        assert_eq!(
            rt.kinds(),
            vec![
                TurnKind::Agent,
                TurnKind::User,
                TurnKind::AgentInternal,
                TurnKind::Agent
            ]
        );
        assert_eq!(turns[3].content.text(), Some("Please drink water and rest."));
    }

    #[tokio::test]
    async fn test_submit_while_busy_is_rejected() {
        let llm = Arc::new(DelayedMockCompletionClient::new(
            "slow-model",
            Duration::from_millis(300),
        ));
        llm.queue_response(r#"{"thought": "t", "plan": [], "actions": [], "response": "ok"}"#);

        let mut rt = TestOrchestrator::builder()
            .completion(llm.clone())
            .build()
            .await;
        rt.handle.submit("first").await.unwrap();
        assert!(rt.wait_for_phase(AgentPhase::Thinking, WAIT).await);

        rt.handle.submit("second").await.unwrap();
        let reason = rt.wait_for_rejection(WAIT).await;
        assert!(reason.unwrap().contains("busy"));
        assert!(rt.wait_for_done(WAIT).await);

        assert_eq!(llm.recorded_prompts().len(), 1);
        let users: Vec<_> = rt
            .turns()
            .into_iter()
            .filter(|t| t.kind() == TurnKind::User)
            .collect();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].content.text(), Some("first"));
    }

    #[tokio::test]
    async fn test_empty_submit_is_rejected() {
        let mut rt = TestOrchestrator::builder().build().await;
        rt.handle.submit("   ").await.unwrap();
        assert!(rt.wait_for_rejection(WAIT).await.is_some());
        assert_eq!(rt.kinds(), vec![TurnKind::Agent]);
    }

    #[tokio::test]
    async fn test_each_action_gets_one_tool_turn_in_order() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response(
            json!({
                "thought": "Several things to do",
                "plan": ["Search", "Advise", "Check"],
                "actions": [
                    {"tool": "search_symptoms", "params": {"symptoms": ["fever", "cough"]}},
                    {"tool": "health_tip", "params": {"topic": "fever"}},
                    {"tool": "teleport_patient", "params": {}}
                ],
                "response": "Done checking."
            })
            .to_string(),
        );

        let mut rt = TestOrchestrator::builder().completion(llm).build().await;
        rt.handle.submit("fever and cough").await.unwrap();
        assert!(rt.wait_for_done(WAIT).await);

        let turns = rt.turns();
        let tools = tool_turns(&turns);
        let names: Vec<_> = tools.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(names, vec!["search_symptoms", "health_tip", "teleport_patient"]);
        assert!(tools.iter().all(|t| t.1 == ToolStatus::Completed));
        // Unknown tools resolve quietly
        assert_eq!(tools[2].2.as_deref(), Some("Done"));
        assert_eq!(turns.last().unwrap().content.text(), Some("Done checking."));
    }

    #[tokio::test]
    async fn test_crashing_tool_fails_and_round_continues() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response(
            json!({
                "thought": "t",
                "plan": [],
                "actions": [
                    {"tool": "health_tip", "params": {"topic": "sleep"}},
                    {"tool": "emergency_protocol", "params": {}}
                ],
                "response": "Stay safe."
            })
            .to_string(),
        );
        let tools = Arc::new(MockToolExecutor::new().with_panic("health_tip"));

        let mut rt = TestOrchestrator::builder()
            .completion(llm)
            .tools(tools.clone())
            .build()
            .await;
        rt.handle.submit("I can't sleep and my chest hurts").await.unwrap();
        assert!(rt.wait_for_done(WAIT).await);

        let turns = rt.turns();
        let statuses: Vec<_> = tool_turns(&turns).into_iter().map(|t| t.1).collect();
        assert_eq!(statuses, vec![ToolStatus::Failed, ToolStatus::Completed]);
        assert_eq!(
            tools.recorded_executions(),
            vec!["health_tip".to_string(), "emergency_protocol".to_string()]
        );
        assert_eq!(turns.last().unwrap().content.text(), Some("Stay safe."));

        match rt.next_host_signal(WAIT).await {
            Some(HostSignal::SurfaceEmergency) => {}
            other => panic!("expected emergency signal, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_directory_failure_marks_tool_failed() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response(FEVER_REPLY);

        let mut rt = TestOrchestrator::builder()
            .completion(llm)
            .directory(Arc::new(MockDirectory::failing()))
            .build()
            .await;
        rt.handle.submit("fever").await.unwrap();
        assert!(rt.wait_for_done(WAIT).await);

        let turns = rt.turns();
        let tools = tool_turns(&turns);
        assert_eq!(tools[0].1, ToolStatus::Failed);
        assert!(tools[0].2.as_deref().unwrap().starts_with("Search failed"));
        assert_eq!(turns.last().unwrap().kind(), TurnKind::Agent);
    }

    #[tokio::test]
    async fn test_switch_language_starts_fresh_session() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response("ok");
        let storage = Arc::new(InMemoryStorage::new());

        let mut rt = TestOrchestrator::builder()
            .completion(llm)
            .storage(storage.clone())
            .build()
            .await;
        rt.handle.submit("hello").await.unwrap();
        assert!(rt.wait_for_done(WAIT).await);
        assert!(rt.turns().len() > 1);

        rt.handle.switch_language(Language::Hi).await.unwrap();
        assert!(
            rt.wait_for_snapshot(WAIT, |s| s.language == Language::Hi)
                .await
        );

        let snapshot = rt.handle.snapshot();
        assert_eq!(snapshot.turns.len(), 1);
        assert_eq!(
            snapshot.turns[0].content.text(),
            Some(Language::Hi.profile().welcome)
        );
        assert!(snapshot.plan.is_empty());

        let doc = storage.document(storage.device()).unwrap();
        assert_eq!(doc["language"], json!("hi"));
    }

    #[tokio::test]
    async fn test_clear_keeps_language() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response("ok");
        let storage = Arc::new(InMemoryStorage::new());

        let mut rt = TestOrchestrator::builder()
            .language(Language::Fr)
            .completion(llm)
            .storage(storage.clone())
            .build()
            .await;
        rt.handle.submit("bonjour").await.unwrap();
        assert!(rt.wait_for_done(WAIT).await);
        let doc = storage.document(storage.device()).unwrap();
        let stored = migrate_document(doc, storage.device(), Language::En, Utc::now());
        assert_eq!(stored.turns.len(), 4);

        rt.handle.clear().await.unwrap();
        assert!(rt.wait_for_snapshot(WAIT, |s| s.turns.len() == 1).await);
        let snapshot = rt.handle.snapshot();
        assert_eq!(snapshot.language, Language::Fr);
        assert_eq!(
            snapshot.turns[0].content.text(),
            Some(Language::Fr.profile().welcome)
        );

        // The old transcript is gone from storage too
        let doc = storage.document(storage.device()).unwrap();
        let stored = migrate_document(doc, storage.device(), Language::En, Utc::now());
        assert_eq!(stored.language, Language::Fr);
        assert_eq!(stored.turns, snapshot.turns);
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response(FEVER_REPLY);
        let storage = Arc::new(InMemoryStorage::new());

        let mut first = TestOrchestrator::builder()
            .completion(llm)
            .storage(storage.clone())
            .build()
            .await;
        first.handle.submit("fever").await.unwrap();
        assert!(first.wait_for_done(WAIT).await);
        let before = first.turns();
        drop(first);

        let second = TestOrchestrator::builder()
            .language(Language::Hi)
            .storage(storage)
            .build()
            .await;
        let snapshot = second.handle.snapshot();
        assert_eq!(snapshot.turns, before);
        // Stored language wins over the configured default
        assert_eq!(snapshot.language, Language::En);
    }

    #[tokio::test]
    async fn test_interrupted_tool_reloads_as_failed() {
        let storage = Arc::new(InMemoryStorage::new());
        storage.insert_raw(
            "test-device",
            json!({
                "language": "en",
                "turns": [
                    {"kind": "user", "content": {"text": "find me a doctor"}},
                    {"kind": "tool_execution", "content": {
                        "tool": {"name": "find_specialist", "label": "Searching specialists", "params": {}},
                        "status": "running"
                    }}
                ]
            }),
        );

        let rt = TestOrchestrator::builder().storage(storage).build().await;
        let turns = rt.turns();
        let tools = tool_turns(&turns);
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].1, ToolStatus::Failed);
        assert_eq!(tools[0].2.as_deref(), Some(INTERRUPTED_RESULT));
    }

    #[tokio::test]
    async fn test_failing_storage_does_not_block_round() {
        let llm = Arc::new(MockCompletionClient::new("test-model"));
        llm.queue_response(FEVER_REPLY);

        let mut rt = TestOrchestrator::builder()
            .completion(llm)
            .storage(Arc::new(FailingStorage))
            .build()
            .await;
        rt.handle.submit("fever").await.unwrap();
        assert!(rt.wait_for_done(WAIT).await);
        assert_eq!(rt.turns().len(), 5);
    }

    #[tokio::test]
    async fn test_host_message_during_round() {
        let llm = Arc::new(DelayedMockCompletionClient::new(
            "slow-model",
            Duration::from_millis(300),
        ));
        llm.queue_response(r#"{"thought": "t", "plan": [], "actions": [], "response": "All set."}"#);

        let mut rt = TestOrchestrator::builder().completion(llm).build().await;
        rt.handle.submit("book me in").await.unwrap();
        assert!(rt.wait_for_phase(AgentPhase::Thinking, WAIT).await);

        rt.handle
            .post_agent_message("Appointment booked for Monday 10:00")
            .await
            .unwrap();
        assert!(rt.wait_for_done(WAIT).await);

        let turns = rt.turns();
        assert_eq!(
            turns[2].content.text(),
            Some("Appointment booked for Monday 10:00")
        );
        assert_eq!(turns.last().unwrap().content.text(), Some("All set."));
    }

    #[tokio::test]
    async fn test_phase_changes_are_broadcast() {
        let rt = TestOrchestrator::builder().build().await;
        let handle = rt.handle.clone();
        let mut ui = handle.subscribe();
        handle.submit("hi").await.unwrap();
        let mut saw_thinking = false;
        while let Ok(Ok(event)) = tokio::time::timeout(WAIT, ui.recv()).await {
            match event {
                UiEvent::PhaseChanged {
                    phase: AgentPhase::Thinking,
                } => saw_thinking = true,
                UiEvent::AgentDone => break,
                _ => {}
            }
        }
        assert!(saw_thinking);
    }
}
