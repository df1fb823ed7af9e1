//! Voice input adapter
//!
//! Wraps a platform speech recognizer. Recognised text only fills the input
//! buffer; submitting it is always an explicit, separate step. The adapter
//! knows nothing about the orchestrator.

use crate::language::Language;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("Speech recognition unavailable: {0}")]
    Unavailable(String),
    #[error("Speech recognition failed: {0}")]
    Recognition(String),
}

/// Platform speech-to-text capture
pub trait SpeechRecognizer: Send {
    fn start(&mut self, locale: &str) -> Result<(), VoiceError>;

    fn stop(&mut self);
}

/// Events delivered by the recognizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    Transcript(String),
    Error(String),
    End,
}

pub struct VoiceInput<R> {
    recognizer: R,
    listening: bool,
    input: String,
}

impl<R: SpeechRecognizer> VoiceInput<R> {
    pub fn new(recognizer: R) -> Self {
        Self {
            recognizer,
            listening: false,
            input: String::new(),
        }
    }

    /// Start capture in the language's recognition locale. No-op while
    /// already listening.
    pub fn start(&mut self, language: Language) -> Result<(), VoiceError> {
        if self.listening {
            return Ok(());
        }
        let locale = language.profile().voice_locale;
        self.recognizer.start(locale)?;
        tracing::debug!(locale, "Voice capture started");
        self.listening = true;
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.listening {
            self.recognizer.stop();
            self.listening = false;
        }
    }

    pub fn handle(&mut self, event: SpeechEvent) {
        match event {
            SpeechEvent::Transcript(text) => {
                self.input = text;
            }
            SpeechEvent::Error(message) => {
                tracing::warn!(error = %message, "Speech recognition error");
                self.listening = false;
            }
            SpeechEvent::End => {
                self.listening = false;
            }
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Current contents of the input buffer
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replace the buffer, as when the user types
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Drain the buffer for submission
    pub fn take_input(&mut self) -> String {
        std::mem::take(&mut self.input)
    }
}
