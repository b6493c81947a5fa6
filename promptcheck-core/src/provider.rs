//! Completion providers.
//!
//! A provider turns a rendered prompt into generated text. The
//! [`CompletionProvider`] trait is the seam between the pipeline and the
//! hosted APIs: the real [`HttpProvider`] targets OpenAI-compatible chat
//! endpoints, while [`crate::MockProvider`] substitutes deterministic
//! responses in tests.

use crate::error::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A text-completion backend.
///
/// Implementations are injected into [`crate::CompletionService`] rather
/// than held as process-wide state, so tests can swap in deterministic
/// stubs.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// The name of this provider (used in logs and error context).
    fn name(&self) -> &str;

    /// Generate text for a fully rendered prompt.
    ///
    /// `max_tokens` bounds the output length; the provider-side timeout and
    /// fallback policy live in [`crate::CompletionService`], not here.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError>;
}

/// Provider for OpenAI-compatible chat-completion endpoints.
///
/// Works against OpenAI itself and any API exposing the same
/// `/chat/completions` shape (Groq, vLLM, local servers).
pub struct HttpProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl HttpProvider {
    /// Create a provider for an OpenAI-compatible endpoint.
    ///
    /// `base_url` is the API root (e.g. `https://api.openai.com/v1`); the
    /// `/chat/completions` path is appended per call.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            client: reqwest::Client::new(),
        }
    }

    /// Set the generation temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The model identifier sent to the API.
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl CompletionProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                code: status.as_u16(),
                body: crate::truncate(&body, 200),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("response has no message content".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_provider_trims_base_url() {
        let provider = HttpProvider::new("p", "https://api.example.com/v1/", "key", "model-x");
        assert_eq!(provider.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_http_provider_debug_redacts_api_key() {
        let provider = HttpProvider::new("p", "https://api.example.com", "secret-key-123", "m");
        let debug_output = format!("{:?}", provider);

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("secret-key-123"));
    }

    #[test]
    fn test_chat_request_serialization() {
        let body = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hello",
            }],
            max_tokens: 64,
            temperature: 0.5,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
        assert_eq!(json["max_tokens"], 64);
    }

    #[test]
    fn test_chat_response_deserialization() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": "hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }

    #[test]
    fn test_chat_response_missing_content() {
        let json = r#"{"choices": [{"message": {"role": "assistant"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
