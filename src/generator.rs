//! Prompt rendering and answer generation.

use tracing::warn;

use crate::providers::{AnswerProvider, ProviderRequest};

/// Returned without calling the provider when retrieval found nothing.
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find relevant information in the document to answer your question.";

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// Default completion token cap.
pub const DEFAULT_MAX_COMPLETION_TOKENS: usize = 1024;

/// Turns a question plus retrieved passages into an answer string.
pub struct AnswerGenerator {
    provider: AnswerProvider,
    temperature: f32,
    max_tokens: usize,
}

impl AnswerGenerator {
    /// Wraps the active provider with sampling settings.
    pub fn new(provider: AnswerProvider, temperature: f32, max_tokens: usize) -> Self {
        Self {
            provider,
            temperature,
            max_tokens,
        }
    }

    /// The provider answers are sent to.
    pub fn provider(&self) -> &AnswerProvider {
        &self.provider
    }

    /// Answers `question` from `contexts`.
    ///
    /// Never fails: an empty context list yields [`NO_CONTEXT_ANSWER`] and a provider error is
    /// folded into the returned text.
    pub fn generate<S: AsRef<str>>(&self, question: &str, contexts: &[S]) -> String {
        if contexts.is_empty() {
            return NO_CONTEXT_ANSWER.to_string();
        }
        let prompt = build_prompt(question, contexts);
        let request = ProviderRequest {
            prompt: &prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        match self.provider.answer(&request) {
            Ok(answer) => answer,
            Err(err) => {
                warn!(provider = self.provider.kind().as_str(), error = %err, "answer generation failed");
                format!("Error generating answer: {err}")
            }
        }
    }
}

/// Renders the numbered context blocks, question, and answering rules.
pub fn build_prompt<S: AsRef<str>>(question: &str, contexts: &[S]) -> String {
    let context_text = contexts
        .iter()
        .enumerate()
        .map(|(idx, ctx)| format!("Context {}:\n{}", idx + 1, ctx.as_ref()))
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = String::new();
    prompt.push_str("You are a helpful AI assistant. Answer the question based ONLY on the provided document context.\n\n");
    prompt.push_str("Context:\n");
    prompt.push_str(&context_text);
    prompt.push_str("\n\nQuestion:\n");
    prompt.push_str(question);
    prompt.push_str("\n\nRules:\n- Use only the document context\n- If insufficient data, clearly state so\n- Be concise and accurate\n\nAnswer:");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderSettings;
    use std::time::Duration;

    fn unreachable_generator() -> AnswerGenerator {
        let settings = ProviderSettings {
            groq_api_key: Some("gsk_test".to_string()),
            groq_base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..ProviderSettings::default()
        };
        let provider = AnswerProvider::from_settings(&settings).expect("provider");
        AnswerGenerator::new(provider, DEFAULT_TEMPERATURE, DEFAULT_MAX_COMPLETION_TOKENS)
    }

    #[test]
    fn prompt_numbers_contexts_and_states_rules() {
        let prompt = build_prompt("What is inertia?", &["first passage", "second passage"]);
        assert!(prompt.contains("Context 1:\nfirst passage\n\nContext 2:\nsecond passage"));
        assert!(prompt.contains("Question:\nWhat is inertia?"));
        assert!(prompt.contains("If insufficient data, clearly state so"));
        assert!(prompt.ends_with("Answer:"));
    }

    #[test]
    fn empty_context_skips_provider() {
        let generator = unreachable_generator();
        let contexts: [&str; 0] = [];
        assert_eq!(generator.generate("anything", &contexts), NO_CONTEXT_ANSWER);
    }

    #[test]
    fn provider_failure_becomes_answer_text() {
        let generator = unreachable_generator();
        let answer = generator.generate("What is inertia?", &["passage"]);
        assert!(answer.starts_with("Error generating answer: "), "{answer}");
    }
}
