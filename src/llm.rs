//! Completion service abstraction
//!
//! One prompt in, one block of text out. No retries: a failure ends the
//! round and the orchestrator apologises.

mod error;
mod gemini;

pub use error::{LlmError, LlmErrorKind};
pub use gemini::GeminiClient;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for completion providers
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send a prompt and return the raw completion text
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    fn model_id(&self) -> &str;
}

#[async_trait]
impl<T: CompletionClient + ?Sized> CompletionClient for Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).complete(prompt).await
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

/// Logging wrapper for completion clients
pub struct LoggingClient {
    inner: Arc<dyn CompletionClient>,
    model_id: String,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn CompletionClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl CompletionClient for LoggingClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(prompt).await;
        let duration = start.elapsed();

        match &result {
            Ok(text) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    prompt_chars = prompt.len(),
                    reply_chars = text.len(),
                    "Completion request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Completion request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
