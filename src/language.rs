//! Language profiles
//!
//! Fixed registry of the languages the assistant can converse in. Each
//! profile carries the seeded welcome text, the composer placeholder and the
//! locale tag handed to speech recognition.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported conversation languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Es,
    Fr,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::Hi, Language::Es, Language::Fr];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Hi => "hi",
            Language::Es => "es",
            Language::Fr => "fr",
        }
    }

    /// Parse a language code. Region suffixes (`es-MX`) and case are ignored.
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code.trim().split(['-', '_']).next().unwrap_or_default();
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(primary))
    }

    pub fn profile(self) -> &'static LanguageProfile {
        match self {
            Language::En => &PROFILES[0],
            Language::Hi => &PROFILES[1],
            Language::Es => &PROFILES[2],
            Language::Fr => &PROFILES[3],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Static per-language presentation data
#[derive(Debug)]
pub struct LanguageProfile {
    pub language: Language,
    /// English name of the language, used when instructing the model
    pub display_name: &'static str,
    pub welcome: &'static str,
    pub placeholder: &'static str,
    /// BCP 47 tag for the speech recognizer
    pub voice_locale: &'static str,
    /// Shown when a round fails and the agent resets
    pub apology: &'static str,
    /// Quick replies offered under the welcome turn
    pub welcome_replies: &'static [&'static str],
}

static PROFILES: [LanguageProfile; 4] = [
    LanguageProfile {
        language: Language::En,
        display_name: "English",
        welcome: "Hello! I'm your health assistant. Tell me how you're feeling and I can suggest next steps, find a specialist, or help you book an appointment.",
        placeholder: "Describe your symptoms...",
        voice_locale: "en-US",
        apology: "Sorry, I ran into a problem while working on that. Please try again.",
        welcome_replies: &["I have a fever", "Find a doctor", "Book an appointment"],
    },
    LanguageProfile {
        language: Language::Hi,
        display_name: "Hindi",
        welcome: "नमस्ते! मैं आपका स्वास्थ्य सहायक हूँ। बताइए आप कैसा महसूस कर रहे हैं, मैं आगे के कदम सुझा सकता हूँ, विशेषज्ञ ढूँढ सकता हूँ या अपॉइंटमेंट बुक करने में मदद कर सकता हूँ।",
        placeholder: "अपने लक्षण बताइए...",
        voice_locale: "hi-IN",
        apology: "क्षमा करें, कुछ गड़बड़ हो गई। कृपया फिर से प्रयास करें।",
        welcome_replies: &["मुझे बुखार है", "डॉक्टर खोजें", "अपॉइंटमेंट बुक करें"],
    },
    LanguageProfile {
        language: Language::Es,
        display_name: "Spanish",
        welcome: "¡Hola! Soy tu asistente de salud. Cuéntame cómo te sientes y puedo sugerirte los próximos pasos, encontrar un especialista o ayudarte a reservar una cita.",
        placeholder: "Describe tus síntomas...",
        voice_locale: "es-ES",
        apology: "Lo siento, tuve un problema al procesar eso. Por favor, inténtalo de nuevo.",
        welcome_replies: &["Tengo fiebre", "Buscar un médico", "Reservar una cita"],
    },
    LanguageProfile {
        language: Language::Fr,
        display_name: "French",
        welcome: "Bonjour ! Je suis votre assistant santé. Dites-moi comment vous vous sentez et je peux vous proposer des prochaines étapes, trouver un spécialiste ou vous aider à prendre rendez-vous.",
        placeholder: "Décrivez vos symptômes...",
        voice_locale: "fr-FR",
        apology: "Désolé, un problème est survenu pendant le traitement. Veuillez réessayer.",
        welcome_replies: &["J'ai de la fièvre", "Trouver un médecin", "Prendre rendez-vous"],
    },
];
