//! OpenAI-compatible chat completions client (OpenAI, OpenRouter).

use super::http::{build_http_client, send_json, trim_base};
use super::{TextGenerator, TextRequest};
use crate::config::ProviderSettings;
use crate::errors::ProviderError;
use crate::retry::{with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Client for any `/chat/completions` endpoint with bearer auth.
#[derive(Clone, Debug)]
pub struct OpenAiCompatibleClient {
    provider: String,
    api_key: String,
    base_url: String,
    model: String,
    client: Client,
    timeout: Option<Duration>,
    retry: RetryConfig,
}

impl OpenAiCompatibleClient {
    /// Creates a client. `provider` names it in errors ("openai", "openrouter").
    pub fn new(
        provider: impl Into<String>,
        settings: &ProviderSettings,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        let provider = provider.into();
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::missing_credential(&provider))?;
        Ok(Self {
            provider,
            api_key,
            base_url: trim_base(&settings.base_url).to_string(),
            model: settings.model.clone(),
            client: build_http_client(timeout)?,
            timeout,
            retry: RetryConfig::default(),
        })
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn complete_once(&self, request: &TextRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response: ChatResponse = send_json(
            &self.provider,
            self.timeout,
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body),
        )
        .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ProviderError::invalid_response(&self.provider, "no message content"))
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    async fn generate(&self, request: &TextRequest) -> Result<String, ProviderError> {
        debug!(provider = %self.provider, model = %self.model, "Requesting chat completion");
        with_retry(&self.retry, &self.provider, || self.complete_once(request)).await
    }
}
