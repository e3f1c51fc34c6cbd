//! Chat completion providers.
//!
//! The engine talks to two independent chat providers: a primary/local
//! model and a secondary/cloud model. Both are reached through the
//! [`ChatProvider`] trait so pipeline stages and the summarizer stay
//! provider-agnostic and tests can script responses.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::QaError;

/// A chat completion backend.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Sends `prompt` as a single user message and returns the completion
    /// text.
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, QaError>;

    /// Identifier of the underlying model.
    fn model_name(&self) -> &str;
}

// ============ HTTP provider (OpenAI-compatible) ============

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
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
    content: String,
}

/// Chat provider speaking the OpenAI-compatible `/chat/completions` wire
/// format over HTTP.
pub struct HttpChatProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl HttpChatProvider {
    /// Creates a provider for the given endpoint URL, API key, and model.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Creates a provider from environment variables with the given
    /// prefix, e.g. prefix `QASMITH_CHAT` reads `QASMITH_CHAT_ENDPOINT`,
    /// `QASMITH_CHAT_API_KEY`, and `QASMITH_CHAT_MODEL` (a `.env` file is
    /// honored).
    pub fn from_env(prefix: &str) -> Result<Self, QaError> {
        dotenvy::dotenv().ok();
        let read = |suffix: &str| {
            let name = format!("{prefix}_{suffix}");
            std::env::var(&name).map_err(|_| QaError::LlmProvider {
                provider: prefix.to_string(),
                message: format!("{name} is not set"),
            })
        };
        Ok(Self::new(
            read("ENDPOINT")?,
            read("API_KEY")?,
            read("MODEL")?,
        ))
    }
}

#[async_trait]
impl ChatProvider for HttpChatProvider {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, QaError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QaError::LlmProvider {
                provider: self.model.clone(),
                message: format!("chat endpoint returned {status}: {body}"),
            });
        }

        let payload: ChatResponse = response.json().await.map_err(|e| QaError::LlmProvider {
            provider: self.model.clone(),
            message: format!("invalid response payload: {e}"),
        })?;

        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| QaError::LlmProvider {
                provider: self.model.clone(),
                message: "response contained no choices".into(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
