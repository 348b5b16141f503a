//! Hosted language-model providers.
//!
//! Exactly one provider is active per process. It is resolved once from the available
//! credentials, Groq first and Gemini second, and never swapped at runtime.

use std::time::Duration;

use crate::error::{RagError, Result};

mod gemini;
mod groq;

pub use gemini::{GeminiProvider, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use groq::{GroqProvider, DEFAULT_GROQ_BASE_URL, DEFAULT_GROQ_MODEL};

/// Request envelope shared by the providers.
pub struct ProviderRequest<'a> {
    /// Fully rendered user prompt.
    pub prompt: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion token cap.
    pub max_tokens: usize,
}

/// Credentials and endpoints used to resolve the active provider.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Groq API key, preferred when present.
    pub groq_api_key: Option<String>,
    /// Groq chat model.
    pub groq_model: String,
    /// Groq OpenAI-compatible base URL.
    pub groq_base_url: String,
    /// Gemini API key, used when no Groq key is present.
    pub gemini_api_key: Option<String>,
    /// Gemini model.
    pub gemini_model: String,
    /// Gemini REST base URL.
    pub gemini_base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_model: DEFAULT_GROQ_MODEL.to_string(),
            groq_base_url: DEFAULT_GROQ_BASE_URL.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

/// Which provider the process will use, without building its HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Groq chat completions.
    Groq,
    /// Google Gemini generateContent.
    Gemini,
}

impl ProviderKind {
    /// Picks Groq when its key is set, else Gemini, else `None`.
    pub fn select(groq_api_key: Option<&str>, gemini_api_key: Option<&str>) -> Option<Self> {
        if has_key(groq_api_key) {
            Some(Self::Groq)
        } else if has_key(gemini_api_key) {
            Some(Self::Gemini)
        } else {
            None
        }
    }

    /// Lowercase provider label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Gemini => "gemini",
        }
    }
}

fn has_key(key: Option<&str>) -> bool {
    key.is_some_and(|k| !k.trim().is_empty())
}

/// The active answer provider.
pub enum AnswerProvider {
    /// Groq chat completions.
    Groq(GroqProvider),
    /// Google Gemini.
    Gemini(GeminiProvider),
}

impl AnswerProvider {
    /// Resolves the provider from credentials; fails when neither key is set.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self> {
        let kind = ProviderKind::select(
            settings.groq_api_key.as_deref(),
            settings.gemini_api_key.as_deref(),
        )
        .ok_or_else(|| {
            RagError::Config("either GROQ_API_KEY or GEMINI_API_KEY must be set".to_string())
        })?;
        match kind {
            ProviderKind::Groq => {
                let key = settings.groq_api_key.as_deref().unwrap_or_default();
                Ok(Self::Groq(GroqProvider::new(
                    key,
                    settings.groq_model.clone(),
                    &settings.groq_base_url,
                    settings.timeout,
                )?))
            }
            ProviderKind::Gemini => {
                let key = settings.gemini_api_key.as_deref().unwrap_or_default();
                Ok(Self::Gemini(GeminiProvider::new(
                    key,
                    settings.gemini_model.clone(),
                    &settings.gemini_base_url,
                    settings.timeout,
                )?))
            }
        }
    }

    /// Which provider this is.
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Groq(_) => ProviderKind::Groq,
            Self::Gemini(_) => ProviderKind::Gemini,
        }
    }

    /// Model identifier sent with each request.
    pub fn model(&self) -> &str {
        match self {
            Self::Groq(provider) => provider.model(),
            Self::Gemini(provider) => provider.model(),
        }
    }

    /// `provider:model` label reported by health checks.
    pub fn label(&self) -> String {
        format!("{}:{}", self.kind().as_str(), self.model())
    }

    /// Sends the prompt and returns the model's text.
    pub fn answer(&self, request: &ProviderRequest) -> Result<String> {
        match self {
            Self::Groq(provider) => provider.answer(request),
            Self::Gemini(provider) => provider.answer(request),
        }
    }
}
