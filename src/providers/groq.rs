use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::ProviderRequest;
use crate::error::{RagError, Result};

/// Default Groq chat model.
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
/// Groq's OpenAI-compatible API root.
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const SYSTEM_PROMPT: &str =
    "You are a helpful AI assistant that answers questions based on provided context.";

/// Blocking client for Groq chat completions.
pub struct GroqProvider {
    api_key: String,
    model: String,
    endpoint: String,
    client: Client,
}

impl GroqProvider {
    /// Builds a client for `model` against `base_url`.
    pub fn new(api_key: &str, model: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RagError::Provider(format!("failed to build Groq HTTP client: {e}")))?;
        Ok(Self {
            api_key: api_key.trim().to_string(),
            model,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            client,
        })
    }

    /// Chat model identifier.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) fn answer(&self, request: &ProviderRequest) -> Result<String> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| RagError::Config("invalid Groq API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = ChatRequest {
            model: &self.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: request.prompt,
                },
            ],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .headers(headers)
            .json(&body)
            .send()
            .map_err(|e| RagError::Provider(format!("failed to call Groq chat completions: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(RagError::Provider(format!("Groq returned {status}: {text}")));
        }
        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| RagError::Provider(format!("failed to parse Groq response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| RagError::Provider("Groq response contained no message".to_string()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"Newton"}},{"message":{"content":"x"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).expect("valid json");
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Newton")
        );
    }

    #[test]
    fn request_body_carries_system_and_user_turns() {
        let body = ChatRequest {
            model: DEFAULT_GROQ_MODEL,
            temperature: 0.3,
            max_tokens: 1024,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: "q",
                },
            ],
        };
        let value = serde_json::to_value(&body).expect("serializes");
        assert_eq!(value["model"], "llama-3.3-70b-versatile");
        assert_eq!(value["max_tokens"], 1024);
        assert_eq!(value["messages"][1]["role"], "user");
    }
}
